use std::collections::HashSet;

use crate::document::format::classify;
use crate::document::locator;
use crate::document::read::{WorkflowSnapshot, read_workflow};
use crate::document::Lines;
use crate::dsl::START;
use crate::error::RefactorError;
use crate::refactor::{ChainSelection, Predecessor};
use crate::schema::ConstructSchema;

fn invalid(reason: impl Into<String>) -> RefactorError {
    RefactorError::InvalidSelection(vec![reason.into()])
}

/// Checks that `ids` form one contiguous, non-branching `next` chain inside
/// `workflow`, and finds what leads into and out of it.
pub fn validate(
    doc: &str,
    workflow: &str,
    ids: &[String],
    schema: &ConstructSchema,
) -> Result<ChainSelection, RefactorError> {
    let lines = Lines::parse(doc);
    let span = locator::workflow_span(lines.as_slice(), workflow)
        .ok_or_else(|| invalid(format!("workflow '{}' does not exist", workflow)))?;
    let snapshot = read_workflow(lines.as_slice(), &span);
    validate_snapshot(&snapshot, ids, schema)
}

pub(crate) fn validate_snapshot(
    snapshot: &WorkflowSnapshot,
    ids: &[String],
    schema: &ConstructSchema,
) -> Result<ChainSelection, RefactorError> {
    let mut reasons = Vec::new();
    if ids.len() < 2 {
        reasons.push("select at least two nodes".to_string());
    }

    let mut selected: HashSet<&str> = HashSet::new();
    for id in ids {
        if !selected.insert(id.as_str()) {
            reasons.push(format!("'{}' is selected more than once", id));
            continue;
        }
        if id == START {
            reasons.push("the start node cannot be extracted".to_string());
            continue;
        }
        match snapshot.node(id) {
            None => reasons.push(format!(
                "'{}' is not a node of workflow '{}'",
                id, snapshot.name
            )),
            Some(node) if schema.is_branching(&node.opcode) => reasons.push(format!(
                "'{}' ({}) has branches and cannot be extracted",
                id, node.opcode
            )),
            Some(_) => {}
        }
    }
    if !reasons.is_empty() {
        return Err(RefactorError::InvalidSelection(reasons));
    }

    let next_of = |id: &str| snapshot.node(id).and_then(|n| n.next.as_deref());

    let heads: Vec<&str> = ids
        .iter()
        .map(String::as_str)
        .filter(|id| {
            !ids.iter()
                .any(|other| other.as_str() != *id && next_of(other) == Some(*id))
        })
        .collect();
    let head = match heads.as_slice() {
        [head] => *head,
        [] => return Err(invalid("selection has no first node (it loops)")),
        many => {
            return Err(invalid(format!(
                "selection is not a single chain: {} nodes have no selected predecessor",
                many.len()
            )));
        }
    };

    let mut chain = vec![head.to_string()];
    let mut seen: HashSet<&str> = HashSet::from([head]);
    let mut current = head;
    while let Some(next) = next_of(current) {
        if !selected.contains(next) || !seen.insert(next) {
            break;
        }
        chain.push(next.to_string());
        current = next;
    }
    if chain.len() != ids.len() {
        return Err(invalid("selection is disconnected"));
    }

    let tail = current.to_string();
    let successor = next_of(current)
        .filter(|s| !selected.contains(s))
        .map(str::to_string);

    let outside = snapshot.nodes.iter().filter(|n| !selected.contains(n.id.as_str()));
    let predecessor = outside
        .clone()
        .find(|n| n.next.as_deref() == Some(head))
        .map(|n| Predecessor::Next(n.id.clone()))
        .or_else(|| {
            outside.clone().find_map(|n| {
                n.inputs.iter().find_map(|(label, raw)| {
                    let slot = classify(raw)?;
                    (slot.branch_target()? == Some(head)).then(|| Predecessor::Branch {
                        node: n.id.clone(),
                        label: label.clone(),
                    })
                })
            })
        });

    Ok(ChainSelection {
        workflow: snapshot.name.clone(),
        chain,
        head: head.to_string(),
        tail,
        predecessor,
        successor,
    })
}

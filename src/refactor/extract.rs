use std::collections::HashSet;

use tracing::info;

use crate::document::locator;
use crate::document::read::{WorkflowSnapshot, read_workflow};
use crate::document::{Lines, rebase};
use crate::dsl::{Interface, Slot, Value, Variable};
use crate::edit::node::create_node_with;
use crate::edit::workflow::insert_workflow;
use crate::edit::{delete_node, set_branch_in, set_next_in};
use crate::error::{EditError, RefactorError};
use crate::refactor::validate::validate_snapshot;
use crate::refactor::{Extraction, Predecessor};
use crate::schema::ConstructSchema;

const CALL_OPCODE: &str = "workflow_call";

/// Moves the chain `ids` (with every reporter it references) out of
/// `workflow` into a new workflow `name`, and leaves a `workflow_call` node
/// in its place wired to the old predecessor and successor.
///
/// Call arguments follow the new interface's inputs in order, each passed
/// as the variable of the same name.
pub fn extract(
    doc: &str,
    workflow: &str,
    ids: &[String],
    name: &str,
    interface: &Interface,
    variables: &[Variable],
    schema: &ConstructSchema,
) -> Result<Extraction, RefactorError> {
    let lines = Lines::parse(doc);
    let span = locator::workflow_span(lines.as_slice(), workflow).ok_or_else(|| {
        RefactorError::InvalidSelection(vec![format!("workflow '{}' does not exist", workflow)])
    })?;
    let snapshot = read_workflow(lines.as_slice(), &span);
    let selection = validate_snapshot(&snapshot, ids, schema)?;

    if locator::workflow_span(lines.as_slice(), name).is_some() {
        return Err(RefactorError::AlreadyExists(name.to_string()));
    }

    let moved = with_reporters(&snapshot, &selection.chain);
    let blocks = locator::workflow_nodes(lines.as_slice(), &span);
    let mut captured = Vec::with_capacity(moved.len());
    for id in &moved {
        let block = blocks
            .iter()
            .find(|b| b.key == *id)
            .ok_or_else(|| EditError::not_found(id.as_str()))?;
        captured.push(rebase(&lines.slice(block.range()), 0));
    }

    let mut text = doc.to_string();
    for id in &moved {
        text = delete_node(&text, id)?;
    }
    text = insert_workflow(&text, name, interface, variables, Some(selection.head.as_str()), &captured)?;
    text = set_next_in(&text, name, &selection.tail, None)?;

    let prefix = schema
        .opcode(CALL_OPCODE)
        .and_then(|s| s.input_prefix.clone())
        .unwrap_or_else(|| "ARG".to_string());
    let mut slots = vec![(
        "WORKFLOW".to_string(),
        Slot::Value(Value::WorkflowCall(name.to_string())),
    )];
    slots.extend(interface.inputs.iter().enumerate().map(|(i, input)| {
        (
            format!("{}{}", prefix, i + 1),
            Slot::Value(Value::variable(input.name.as_str())),
        )
    }));
    let (updated, call_id) = create_node_with(&text, workflow, CALL_OPCODE, slots, schema)?;
    text = updated;

    // Rewiring stays inside the source workflow; the new one has its own `start`.
    match &selection.predecessor {
        Some(Predecessor::Next(from)) => {
            text = set_next_in(&text, workflow, from, Some(call_id.as_str()))?
        }
        Some(Predecessor::Branch { node, label }) => {
            text = set_branch_in(&text, workflow, node, label, Some(call_id.as_str()), schema)?
        }
        None => {}
    }
    if let Some(successor) = &selection.successor {
        text = set_next_in(&text, workflow, &call_id, Some(successor.as_str()))?;
    }

    info!(
        from = workflow,
        to = name,
        call = %call_id,
        nodes = moved.len(),
        "Chain extracted"
    );
    Ok(Extraction {
        document: text,
        workflow: name.to_string(),
        call_id,
        moved,
    })
}

/// The chain in order, followed by every reporter reachable from it.
fn with_reporters(snapshot: &WorkflowSnapshot, chain: &[String]) -> Vec<String> {
    let mut out: Vec<String> = chain.to_vec();
    let mut seen: HashSet<String> = chain.iter().cloned().collect();
    let mut stack: Vec<String> = chain
        .iter()
        .filter_map(|id| snapshot.node(id))
        .flat_map(|n| n.reporter_refs())
        .rev()
        .collect();

    while let Some(id) = stack.pop() {
        let Some(node) = snapshot.node(&id) else {
            continue;
        };
        if !seen.insert(id.clone()) {
            continue;
        }
        stack.extend(node.reporter_refs().into_iter().rev());
        out.push(id);
    }
    out
}

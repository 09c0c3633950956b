use std::collections::HashSet;

use serde_json::Value as JsonValue;

use crate::document::format::classify;
use crate::document::locator;
use crate::document::read::{NodeSnapshot, WorkflowSnapshot, read_workflow};
use crate::document::Lines;
use crate::dsl::{Slot, Value};
use crate::error::{EditError, RefactorError};
use crate::refactor::VariableAnalysis;
use crate::schema::{ConstructSchema, InputKind};

/// Proposes inputs and outputs for a chain about to be extracted.
///
/// A variable read before the chain writes it is an input; anything the
/// chain writes is an output. A variable read first and written later is
/// both. Reads inside embedded reporters count toward their referrer.
pub fn analyze_chain_variables(
    doc: &str,
    workflow: &str,
    chain: &[String],
    schema: &ConstructSchema,
) -> Result<VariableAnalysis, RefactorError> {
    let lines = Lines::parse(doc);
    let span = locator::workflow_span(lines.as_slice(), workflow)
        .ok_or_else(|| EditError::not_found(workflow))?;
    let snapshot = read_workflow(lines.as_slice(), &span);
    Ok(analyze_snapshot(&snapshot, chain, schema))
}

pub(crate) fn analyze_snapshot(
    snapshot: &WorkflowSnapshot,
    chain: &[String],
    schema: &ConstructSchema,
) -> VariableAnalysis {
    let mut analysis = VariableAnalysis::default();
    let mut written: HashSet<String> = HashSet::new();

    for node in chain.iter().filter_map(|id| snapshot.node(id)) {
        let mut reads = Vec::new();
        let mut writes = Vec::new();
        let mut seen = HashSet::new();
        accesses(snapshot, node, schema, &mut reads, &mut writes, &mut seen);

        for name in reads {
            if !written.contains(&name) && !analysis.inputs.contains(&name) {
                analysis.inputs.push(name);
            }
        }
        for name in writes {
            if !analysis.outputs.contains(&name) {
                analysis.outputs.push(name.clone());
            }
            written.insert(name);
        }
    }
    analysis
}

fn accesses(
    snapshot: &WorkflowSnapshot,
    node: &NodeSnapshot,
    schema: &ConstructSchema,
    reads: &mut Vec<String>,
    writes: &mut Vec<String>,
    seen: &mut HashSet<String>,
) {
    if !seen.insert(node.id.clone()) {
        return;
    }
    let spec = schema.opcode(&node.opcode);

    for (key, raw) in &node.inputs {
        let Some(Slot::Value(value)) = classify(raw) else {
            continue;
        };
        let names_variable = spec
            .and_then(|s| s.input_decl(key))
            .is_some_and(|d| d.kind == InputKind::Variable);

        if names_variable {
            if let Some(name) = variable_name(&value) {
                if spec.is_some_and(|s| s.assigns) {
                    writes.push(name);
                } else {
                    reads.push(name);
                }
            }
            continue;
        }

        match value {
            Value::Variable(name) => reads.push(name),
            Value::Node(id) => {
                if let Some(reporter) = snapshot.node(&id) {
                    // Reporters only read.
                    let mut ignored = Vec::new();
                    accesses(snapshot, reporter, schema, reads, &mut ignored, seen);
                }
            }
            _ => {}
        }
    }
}

/// Variable named by a variable-kind input, written either as a reference
/// or as a bare string literal.
fn variable_name(value: &Value) -> Option<String> {
    match value {
        Value::Variable(name) => Some(name.clone()),
        Value::Literal(JsonValue::String(name)) if !name.is_empty() => Some(name.clone()),
        _ => None,
    }
}

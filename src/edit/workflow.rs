use tracing::debug;

use crate::document::format::{render_node, render_workflow};
use crate::document::locator::{self, Block};
use crate::document::Lines;
use crate::dsl::{Interface, MAIN, START, Variable};
use crate::edit::{EditResult, insert_children};
use crate::error::EditError;

pub fn list_workflows(doc: &str) -> Vec<String> {
    let lines = Lines::parse(doc);
    locator::workflows(lines.as_slice())
        .into_iter()
        .map(|w| w.name)
        .collect()
}

fn workflows_root(lines: &Lines) -> EditResult<Block> {
    (0..lines.len())
        .find_map(|i| locator::entry_at(lines.as_slice(), i).filter(|b| b.key == "workflows"))
        .ok_or_else(|| EditError::not_found("workflows"))
}

/// Appends a workflow with the given interface and variables and a bare
/// `start` node.
pub fn create_workflow(
    doc: &str,
    name: &str,
    interface: &Interface,
    variables: &[Variable],
) -> EditResult {
    insert_workflow(doc, name, interface, variables, None, &[])
}

/// Appends a workflow whose `start` points at `start_next`, followed by
/// the given node blocks (at any indentation).
pub(crate) fn insert_workflow(
    doc: &str,
    name: &str,
    interface: &Interface,
    variables: &[Variable],
    start_next: Option<&str>,
    nodes: &[Vec<String>],
) -> EditResult {
    let mut lines = Lines::parse(doc);
    if locator::workflow_span(lines.as_slice(), name).is_some() {
        return Err(EditError::AlreadyExists(name.to_string()));
    }
    let root = workflows_root(&lines)?;

    let mut blocks = vec![render_node(START, "start", start_next, &[], 0)];
    blocks.extend(nodes.iter().cloned());
    insert_children(&mut lines, &root, None, |column| {
        render_workflow(name, interface, variables, &blocks, column)
    })?;
    debug!(workflow = name, nodes = blocks.len(), "Workflow created");
    Ok(lines.render())
}

/// Removes a workflow entry. `main` cannot be removed.
pub fn delete_workflow(doc: &str, name: &str) -> EditResult {
    if name == MAIN {
        return Err(EditError::Reserved(name.to_string()));
    }
    let mut lines = Lines::parse(doc);
    let span = locator::workflow_span(lines.as_slice(), name)
        .ok_or_else(|| EditError::not_found(name))?;
    lines.remove(span.range());
    Ok(lines.render())
}

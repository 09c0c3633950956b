//! Mutation engine.
//!
//! Every command takes the full document text and returns either the full
//! rewritten text or an [`EditError`]. Nothing is written until a command
//! has located everything it needs, so a failed command never leaves a
//! partial edit behind. [`Outcome`] is the `{document, success, id}` form
//! handed to editing front-ends.

pub mod branch;
pub mod interface;
pub mod node;
pub mod variables;
pub mod workflow;

use serde::Serialize;
use tracing::debug;

use crate::document::Lines;
use crate::document::locator::{self, Block};
use crate::error::EditError;

pub use branch::{
    add_dynamic_branch, add_dynamic_input, clear_branch, disconnect, remove_dynamic_branch,
    remove_dynamic_input, set_branch, set_branch_in, set_input,
};
pub use interface::{
    add_interface_output, read_interface, remove_interface_input, remove_interface_output,
    set_interface_outputs, upsert_interface_input,
};
pub use node::{clear_next, create_node, delete_node, duplicate_node, set_next, set_next_in};
pub use variables::{remove_variable, rename_variable, set_variable};
pub use workflow::{create_workflow, delete_workflow, list_workflows};

pub type EditResult<T = String> = Result<T, EditError>;

/// Result of one command as seen by a caller that only deals in strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub document: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    /// On failure the original document is returned untouched.
    pub fn from_result(original: &str, result: EditResult) -> Self {
        match result {
            Ok(document) => Self {
                document,
                success: true,
                id: None,
                error: None,
            },
            Err(e) => Self::failed(original, e),
        }
    }

    /// For creating commands that also report the generated id.
    pub fn from_created(original: &str, result: EditResult<(String, String)>) -> Self {
        match result {
            Ok((document, id)) => Self {
                document,
                success: true,
                id: Some(id),
                error: None,
            },
            Err(e) => Self::failed(original, e),
        }
    }

    fn failed(original: &str, e: EditError) -> Self {
        debug!(error = %e, "Edit rejected");
        Self {
            document: original.to_string(),
            success: false,
            id: None,
            error: Some(e.to_string()),
        }
    }
}

/// Locates a node anywhere in the document.
pub(crate) fn node_block(lines: &Lines, id: &str) -> EditResult<Block> {
    node_block_in(lines, None, id)
}

/// Locates a node inside `workflow`, or anywhere when unscoped. Every
/// workflow has its own `start`, so an unscoped `start` is the first one.
pub(crate) fn node_block_in(lines: &Lines, workflow: Option<&str>, id: &str) -> EditResult<Block> {
    let Some(workflow) = workflow else {
        return locator::locate_node(lines.as_slice(), id)
            .map(|(_, block)| block)
            .ok_or_else(|| EditError::not_found(id));
    };
    let span = locator::workflow_span(lines.as_slice(), workflow)
        .ok_or_else(|| EditError::not_found(workflow))?;
    locator::workflow_nodes(lines.as_slice(), &span)
        .into_iter()
        .find(|b| b.key == id)
        .ok_or_else(|| EditError::not_found(format!("{}.{}", workflow, id)))
}

/// Opcode text of a located node, if it has one.
pub(crate) fn opcode_of(lines: &Lines, node: &Block) -> Option<String> {
    locator::child(lines.as_slice(), node, "opcode")
        .and_then(|b| b.inline)
        .map(|s| crate::document::format::unquote(&s))
}

/// Inserts lines as new children of `parent`, after `after` when given,
/// otherwise after the last existing child. An empty inline parent
/// (`key: {}`) is first expanded to a header. `render` receives the
/// children's column.
pub(crate) fn insert_children(
    lines: &mut Lines,
    parent: &Block,
    after: Option<&Block>,
    render: impl FnOnce(usize) -> Vec<String>,
) -> EditResult<()> {
    let column = locator::child_indent(lines.as_slice(), parent);
    if parent.is_header() {
        let at = after.map(|b| b.end).unwrap_or(parent.end);
        lines.insert(at, render(column));
        return Ok(());
    }
    if !parent.is_empty_inline() {
        return Err(EditError::AmbiguousShape {
            node: parent.key.clone(),
            label: parent.key.clone(),
        });
    }
    let header = format!(
        "{}{}:",
        " ".repeat(parent.indent),
        crate::document::format::format_string(&parent.key)
    );
    let mut replacement = vec![header];
    replacement.extend(render(column));
    lines.replace(parent.range(), replacement);
    Ok(())
}

/// Turns a header whose last child was removed back into `key: {}`.
pub(crate) fn collapse_if_empty(lines: &mut Lines, parent_key: &str, parent_start: usize) {
    let Some(parent) = locator::entry_at(lines.as_slice(), parent_start) else {
        return;
    };
    if parent.key != parent_key || !parent.is_header() {
        return;
    }
    if locator::children(lines.as_slice(), &parent).is_empty() {
        let line = format!(
            "{}{}: {{}}",
            " ".repeat(parent.indent),
            crate::document::format::format_string(&parent.key)
        );
        lines.replace(parent.start..parent.start + 1, vec![line]);
    }
}

/// Smallest unused `<prefix>_<n>` across the whole document.
pub(crate) fn fresh_id(lines: &Lines, prefix: &str) -> String {
    let taken: std::collections::HashSet<String> =
        locator::node_ids(lines.as_slice()).into_iter().collect();
    (1..)
        .map(|n| format!("{}_{}", prefix, n))
        .find(|id| !taken.contains(id))
        .unwrap_or_else(|| format!("{}_new", prefix))
}

use serde_json::Value as JsonValue;

use crate::document::format::{format_string, render_variable};
use crate::document::locator::{self, Block};
use crate::document::Lines;
use crate::dsl::Variable;
use crate::edit::{EditResult, collapse_if_empty, insert_children};
use crate::error::EditError;

fn variables_block(lines: &Lines, workflow: &str) -> EditResult<Block> {
    let span = locator::workflow_span(lines.as_slice(), workflow)
        .ok_or_else(|| EditError::not_found(workflow))?;
    locator::workflow_block(lines.as_slice(), &span, "variables")
        .ok_or_else(|| EditError::not_found(format!("{}.variables", workflow)))
}

/// Inserts a variable or replaces its default value.
pub fn set_variable(doc: &str, workflow: &str, name: &str, default: &JsonValue) -> EditResult {
    let mut lines = Lines::parse(doc);
    let block = variables_block(&lines, workflow)?;
    let variable = Variable::new(name, default.clone());

    match locator::child(lines.as_slice(), &block, name) {
        Some(existing) => {
            let line = render_variable(&variable, existing.indent);
            lines.replace(existing.range(), vec![line]);
        }
        None => insert_children(&mut lines, &block, None, |column| {
            vec![render_variable(&variable, column)]
        })?,
    }
    Ok(lines.render())
}

pub fn remove_variable(doc: &str, workflow: &str, name: &str) -> EditResult {
    let mut lines = Lines::parse(doc);
    let block = variables_block(&lines, workflow)?;
    let existing = locator::child(lines.as_slice(), &block, name)
        .ok_or_else(|| EditError::not_found(format!("{}.variables.{}", workflow, name)))?;
    lines.remove(existing.range());
    collapse_if_empty(&mut lines, "variables", block.start);
    Ok(lines.render())
}

/// Renames the declaration only; references in node inputs are untouched.
pub fn rename_variable(doc: &str, workflow: &str, old: &str, new: &str) -> EditResult {
    let mut lines = Lines::parse(doc);
    let block = variables_block(&lines, workflow)?;
    if locator::child(lines.as_slice(), &block, new).is_some() {
        return Err(EditError::AlreadyExists(new.to_string()));
    }
    let existing = locator::child(lines.as_slice(), &block, old)
        .ok_or_else(|| EditError::not_found(format!("{}.variables.{}", workflow, old)))?;

    let line = match &existing.inline {
        Some(value) => format!("{}{}: {}", " ".repeat(existing.indent), format_string(new), value),
        None => format!("{}{}:", " ".repeat(existing.indent), format_string(new)),
    };
    lines.replace(existing.start..existing.start + 1, vec![line]);
    Ok(lines.render())
}

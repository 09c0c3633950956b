//! Interface edits. The interface block is small, so each command reads it,
//! changes one entry and writes the block back in canonical form.

use crate::document::format::render_interface;
use crate::document::locator::{self, Block};
use crate::document::read;
use crate::document::Lines;
use crate::dsl::{Interface, InterfaceInput};
use crate::edit::EditResult;
use crate::error::EditError;

fn interface_block(lines: &Lines, workflow: &str) -> EditResult<(Block, Interface)> {
    let span = locator::workflow_span(lines.as_slice(), workflow)
        .ok_or_else(|| EditError::not_found(workflow))?;
    let block = locator::workflow_block(lines.as_slice(), &span, "interface")
        .ok_or_else(|| EditError::not_found(format!("{}.interface", workflow)))?;
    Ok((block, read::read_interface(lines.as_slice(), &span)))
}

fn rewrite(doc: &str, workflow: &str, change: impl FnOnce(&mut Interface) -> EditResult<()>) -> EditResult {
    let mut lines = Lines::parse(doc);
    let (block, mut interface) = interface_block(&lines, workflow)?;
    change(&mut interface)?;
    lines.replace(block.range(), render_interface(&interface, block.indent));
    Ok(lines.render())
}

pub fn read_interface(doc: &str, workflow: &str) -> EditResult<Interface> {
    let lines = Lines::parse(doc);
    interface_block(&lines, workflow).map(|(_, interface)| interface)
}

/// Adds an input parameter, or replaces the one with the same name.
pub fn upsert_interface_input(doc: &str, workflow: &str, input: InterfaceInput) -> EditResult {
    rewrite(doc, workflow, |interface| {
        match interface.inputs.iter().position(|i| i.name == input.name) {
            Some(index) => interface.inputs[index] = input,
            None => interface.inputs.push(input),
        }
        Ok(())
    })
}

pub fn remove_interface_input(doc: &str, workflow: &str, name: &str) -> EditResult {
    rewrite(doc, workflow, |interface| {
        let before = interface.inputs.len();
        interface.inputs.retain(|i| i.name != name);
        if interface.inputs.len() == before {
            return Err(EditError::not_found(format!("{}.interface.inputs.{}", workflow, name)));
        }
        Ok(())
    })
}

pub fn add_interface_output(doc: &str, workflow: &str, name: &str) -> EditResult {
    rewrite(doc, workflow, |interface| {
        if interface.outputs.iter().any(|o| o == name) {
            return Err(EditError::AlreadyExists(name.to_string()));
        }
        interface.outputs.push(name.to_string());
        Ok(())
    })
}

pub fn remove_interface_output(doc: &str, workflow: &str, name: &str) -> EditResult {
    rewrite(doc, workflow, |interface| {
        let before = interface.outputs.len();
        interface.outputs.retain(|o| o != name);
        if interface.outputs.len() == before {
            return Err(EditError::not_found(format!("{}.interface.outputs.{}", workflow, name)));
        }
        Ok(())
    })
}

pub fn set_interface_outputs(doc: &str, workflow: &str, outputs: &[String]) -> EditResult {
    rewrite(doc, workflow, |interface| {
        interface.outputs = outputs.to_vec();
        Ok(())
    })
}

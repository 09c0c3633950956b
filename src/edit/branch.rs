//! Input slots: plain values, branches and numbered families.

use tracing::debug;

use crate::document::format::{format_string, parse_slot, render_slot};
use crate::document::locator::{self, Block};
use crate::document::read::read_node;
use crate::document::Lines;
use crate::dsl::{Slot, Value};
use crate::edit::{
    EditResult, collapse_if_empty, insert_children, node_block, node_block_in, opcode_of, set_next,
};
use crate::error::EditError;
use crate::schema::{BranchShape, ConstructSchema, OpcodeSpec, family_index};

fn target_text(to: Option<&str>) -> String {
    to.map(format_string).unwrap_or_else(|| "null".to_string())
}

fn ambiguous(node: &str, label: &str) -> EditError {
    EditError::AmbiguousShape {
        node: node.to_string(),
        label: label.to_string(),
    }
}

/// The node's `inputs` block, optionally creating an empty one.
fn inputs_block(lines: &mut Lines, node_id: &str, create: bool) -> EditResult<Block> {
    scoped_inputs_block(lines, None, node_id, create)
}

fn scoped_inputs_block(
    lines: &mut Lines,
    workflow: Option<&str>,
    node_id: &str,
    create: bool,
) -> EditResult<Block> {
    let node = node_block_in(lines, workflow, node_id)?;
    if !node.is_header() {
        return Err(ambiguous(node_id, "inputs"));
    }
    if let Some(inputs) = locator::child(lines.as_slice(), &node, "inputs") {
        return Ok(inputs);
    }
    if !create {
        return Err(EditError::not_found(format!("{}.inputs", node_id)));
    }
    insert_children(lines, &node, None, |column| {
        vec![format!("{}inputs: {{}}", " ".repeat(column))]
    })?;
    let node = node_block_in(lines, workflow, node_id)?;
    locator::child(lines.as_slice(), &node, "inputs")
        .ok_or_else(|| EditError::not_found(format!("{}.inputs", node_id)))
}

fn replace_branch_line(lines: &mut Lines, line: &Block, to: Option<&str>) {
    let text = format!("{}branch: {}", " ".repeat(line.indent), target_text(to));
    lines.replace(line.range(), vec![text]);
}

/// Rewrites the target of a slot that already exists in block form.
fn retarget_block(lines: &mut Lines, node_id: &str, slot: &Block, to: Option<&str>) -> EditResult<()> {
    let all = lines.as_slice();
    if let Some(branch) = locator::child(all, slot, "branch") {
        replace_branch_line(lines, &branch, to);
        return Ok(());
    }
    let Some(body) = locator::child(all, slot, "body") else {
        return Err(ambiguous(node_id, &slot.key));
    };
    if body.is_header() {
        if let Some(branch) = locator::child(all, &body, "branch") {
            replace_branch_line(lines, &branch, to);
            return Ok(());
        }
        if locator::children(all, &body).is_empty() {
            let column = locator::child_indent(all, &body);
            let text = format!("{}branch: {}", " ".repeat(column), target_text(to));
            lines.insert(body.end, vec![text]);
            return Ok(());
        }
        return Err(ambiguous(node_id, &slot.key));
    }

    let inline_ok = body.is_empty_inline()
        || matches!(
            body.inline.as_deref().and_then(parse_slot),
            Some(Slot::Value(Value::Branch(_)))
        );
    if !inline_ok {
        return Err(ambiguous(node_id, &slot.key));
    }
    let text = format!(
        "{}body: {{ branch: {} }}",
        " ".repeat(body.indent),
        target_text(to)
    );
    lines.replace(body.range(), vec![text]);
    Ok(())
}

fn write_branch(
    lines: &mut Lines,
    workflow: Option<&str>,
    node_id: &str,
    label: &str,
    to: Option<&str>,
    create: bool,
    schema: &ConstructSchema,
) -> EditResult<()> {
    let node = node_block_in(lines, workflow, node_id)?;
    let opcode = opcode_of(lines, &node).unwrap_or_default();
    let fresh = match schema.branch_shape(&opcode, label) {
        BranchShape::Plain => Slot::branch(to),
        BranchShape::Handler => Slot::handler(to),
    };

    let inputs = scoped_inputs_block(lines, workflow, node_id, create)?;
    match locator::child(lines.as_slice(), &inputs, label) {
        Some(slot) if slot.is_header() => {
            if locator::children(lines.as_slice(), &slot).is_empty() {
                lines.replace(slot.range(), render_slot(label, &fresh, slot.indent));
                Ok(())
            } else {
                retarget_block(lines, node_id, &slot, to)
            }
        }
        Some(slot) => {
            let existing = slot.inline.as_deref().and_then(parse_slot);
            let expanded = match existing {
                Some(Slot::Handler { exception_type, .. }) => Slot::Handler {
                    exception_type,
                    body: to.map(str::to_string),
                },
                Some(Slot::Value(Value::Branch(_))) => fresh,
                Some(Slot::Value(Value::Literal(v)))
                    if v.is_null() || v.as_object().is_some_and(|o| o.is_empty()) =>
                {
                    fresh
                }
                _ => return Err(ambiguous(node_id, label)),
            };
            lines.replace(slot.range(), render_slot(label, &expanded, slot.indent));
            Ok(())
        }
        None if create => insert_children(lines, &inputs, None, |column| {
            render_slot(label, &fresh, column)
        }),
        None => Err(EditError::not_found(format!("{}.{}", node_id, label))),
    }
}

/// Connects branch slot `label` of `from` to `to`.
///
/// Handles a block slot with a `branch:` child (or a handler `body`), an
/// inline placeholder such as `THEN: { literal: null }` which is expanded
/// to block form, and a missing slot which is appended to `inputs`.
pub fn set_branch(
    doc: &str,
    from: &str,
    label: &str,
    to: Option<&str>,
    schema: &ConstructSchema,
) -> EditResult {
    let mut lines = Lines::parse(doc);
    write_branch(&mut lines, None, from, label, to, true, schema)?;
    debug!(node = from, label, target = ?to, "Branch set");
    Ok(lines.render())
}

/// [`set_branch`] for a node of one workflow.
pub fn set_branch_in(
    doc: &str,
    workflow: &str,
    from: &str,
    label: &str,
    to: Option<&str>,
    schema: &ConstructSchema,
) -> EditResult {
    let mut lines = Lines::parse(doc);
    write_branch(&mut lines, Some(workflow), from, label, to, true, schema)?;
    debug!(workflow, node = from, label, target = ?to, "Branch set");
    Ok(lines.render())
}

/// Empties an existing branch slot; the slot itself stays.
pub fn clear_branch(doc: &str, from: &str, label: &str, schema: &ConstructSchema) -> EditResult {
    let mut lines = Lines::parse(doc);
    write_branch(&mut lines, None, from, label, None, false, schema)?;
    Ok(lines.render())
}

/// Removes the connection `from -> to`: the `next` pointer when `label` is
/// `None`, otherwise the named branch. Fails when `from` does not currently
/// point at `to`.
pub fn disconnect(
    doc: &str,
    from: &str,
    to: &str,
    label: Option<&str>,
    schema: &ConstructSchema,
) -> EditResult {
    let lines = Lines::parse(doc);
    let node = node_block(&lines, from)?;
    let snapshot =
        read_node(lines.as_slice(), &node).ok_or_else(|| EditError::not_found(from))?;

    match label {
        None if snapshot.next.as_deref() == Some(to) => set_next(doc, from, None),
        None => Err(EditError::not_found(format!("{}.next -> {}", from, to))),
        Some(label) => {
            let current = snapshot
                .slot(label)
                .and_then(|s| s.branch_target().flatten().map(str::to_string));
            if current.as_deref() == Some(to) {
                clear_branch(doc, from, label, schema)
            } else {
                Err(EditError::not_found(format!("{}.{} -> {}", from, label, to)))
            }
        }
    }
}

/// Writes a plain value into input `key`, replacing the whole slot or
/// appending it to `inputs`.
pub fn set_input(doc: &str, node_id: &str, key: &str, value: &Value) -> EditResult {
    let mut lines = Lines::parse(doc);
    let inputs = inputs_block(&mut lines, node_id, true)?;
    let slot = Slot::Value(value.clone());
    match locator::child(lines.as_slice(), &inputs, key) {
        Some(existing) => {
            lines.replace(existing.range(), render_slot(key, &slot, existing.indent));
        }
        None => insert_children(&mut lines, &inputs, None, |column| {
            render_slot(key, &slot, column)
        })?,
    }
    debug!(node = node_id, input = key, "Input set");
    Ok(lines.render())
}

/// Existing `<prefix>N` members of the node's inputs.
fn family_members(lines: &Lines, inputs: &Block, prefix: &str) -> Vec<(u32, Block)> {
    locator::children(lines.as_slice(), inputs)
        .into_iter()
        .filter_map(|c| family_index(&c.key, prefix).map(|n| (n, c)))
        .collect()
}

fn add_member(
    lines: &mut Lines,
    node_id: &str,
    prefix: &str,
    slot: Slot,
) -> EditResult<String> {
    let inputs = inputs_block(lines, node_id, true)?;
    let members = family_members(lines, &inputs, prefix);
    let next = members.iter().map(|(n, _)| *n).max().unwrap_or(0) + 1;
    let key = format!("{}{}", prefix, next);
    let after = members.into_iter().max_by_key(|(_, b)| b.end).map(|(_, b)| b);
    insert_children(lines, &inputs, after.as_ref(), |column| {
        render_slot(&key, &slot, column)
    })?;
    Ok(key)
}

/// Adds the next numbered branch of a dynamic family (`CATCH3` after
/// `CATCH2`). Gaps left by removals are not filled.
pub fn add_dynamic_branch(
    doc: &str,
    node_id: &str,
    prefix: &str,
    schema: &ConstructSchema,
) -> EditResult<(String, String)> {
    let mut lines = Lines::parse(doc);
    let node = node_block(&lines, node_id)?;
    let opcode = opcode_of(&lines, &node).unwrap_or_default();
    let decl = schema
        .opcode(&opcode)
        .and_then(|s| s.branch_family_named(prefix))
        .ok_or_else(|| EditError::NotDynamic {
            opcode: opcode.clone(),
            prefix: prefix.to_string(),
        })?;
    let slot = match decl.shape {
        BranchShape::Plain => Slot::branch(None),
        BranchShape::Handler => Slot::handler(None),
    };
    let key = add_member(&mut lines, node_id, prefix, slot)?;
    debug!(node = node_id, slot = %key, "Dynamic branch added");
    Ok((lines.render(), key))
}

/// Adds the next numbered argument (`ARG2` after `ARG1`), set to null.
pub fn add_dynamic_input(
    doc: &str,
    node_id: &str,
    prefix: &str,
    schema: &ConstructSchema,
) -> EditResult<(String, String)> {
    let mut lines = Lines::parse(doc);
    let node = node_block(&lines, node_id)?;
    let opcode = opcode_of(&lines, &node).unwrap_or_default();
    let allowed = schema
        .opcode(&opcode)
        .is_some_and(|s| s.dynamic_inputs && s.input_prefix.as_deref() == Some(prefix));
    if !allowed {
        return Err(EditError::NotDynamic {
            opcode,
            prefix: prefix.to_string(),
        });
    }
    let slot = Slot::Value(Value::Literal(serde_json::Value::Null));
    let key = add_member(&mut lines, node_id, prefix, slot)?;
    debug!(node = node_id, slot = %key, "Dynamic input added");
    Ok((lines.render(), key))
}

fn remove_slot(doc: &str, node_id: &str, key: &str) -> EditResult {
    let mut lines = Lines::parse(doc);
    let inputs = inputs_block(&mut lines, node_id, false)?;
    let slot = locator::child(lines.as_slice(), &inputs, key)
        .ok_or_else(|| EditError::not_found(format!("{}.{}", node_id, key)))?;
    lines.remove(slot.range());
    collapse_if_empty(&mut lines, "inputs", inputs.start);
    Ok(lines.render())
}

/// Fails unless `key` is a member of a family declared by the node's opcode.
fn check_family_member(
    doc: &str,
    node_id: &str,
    key: &str,
    declared: impl Fn(&OpcodeSpec) -> bool,
    schema: &ConstructSchema,
) -> EditResult<()> {
    let lines = Lines::parse(doc);
    let node = node_block(&lines, node_id)?;
    let opcode = opcode_of(&lines, &node).unwrap_or_default();
    if schema.opcode(&opcode).is_some_and(declared) {
        Ok(())
    } else {
        Err(EditError::NotDynamic {
            opcode,
            prefix: key.to_string(),
        })
    }
}

/// Removes one numbered branch. Surviving members keep their numbers;
/// static slots such as `THEN` are refused.
pub fn remove_dynamic_branch(
    doc: &str,
    node_id: &str,
    key: &str,
    schema: &ConstructSchema,
) -> EditResult {
    check_family_member(
        doc,
        node_id,
        key,
        |spec| {
            spec.branches
                .iter()
                .any(|b| b.dynamic && family_index(key, &b.name).is_some())
        },
        schema,
    )?;
    remove_slot(doc, node_id, key)
}

pub fn remove_dynamic_input(
    doc: &str,
    node_id: &str,
    key: &str,
    schema: &ConstructSchema,
) -> EditResult {
    check_family_member(
        doc,
        node_id,
        key,
        |spec| {
            spec.dynamic_inputs
                && spec
                    .input_prefix
                    .as_deref()
                    .is_some_and(|prefix| family_index(key, prefix).is_some())
        },
        schema,
    )?;
    remove_slot(doc, node_id, key)
}

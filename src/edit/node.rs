use tracing::debug;

use crate::document::format::{classify, format_string, render_node};
use crate::document::locator;
use crate::document::read::read_node;
use crate::document::Lines;
use crate::dsl::{NodeTemplate, START, Slot, Value};
use crate::edit::{EditResult, fresh_id, insert_children, node_block, node_block_in};
use crate::error::EditError;
use crate::schema::{BranchShape, ConstructSchema};

/// Input slots for a new node: the template's parameters when it has any,
/// otherwise the schema's declared inputs. Static branch slots are always
/// reserved with an empty target.
fn template_slots(template: &NodeTemplate, schema: &ConstructSchema) -> Vec<(String, Slot)> {
    let spec = schema.opcode(&template.name);
    let mut slots: Vec<(String, Slot)> = if template.parameters.is_empty() {
        spec.map(|s| {
            s.inputs
                .iter()
                .map(|i| {
                    let default = i.default.clone().unwrap_or_default();
                    (i.name.clone(), Slot::Value(Value::Literal(default)))
                })
                .collect()
        })
        .unwrap_or_default()
    } else {
        template
            .parameters
            .iter()
            .map(|p| {
                let default = p.default.clone().unwrap_or_default();
                (p.name.to_uppercase(), Slot::Value(Value::Literal(default)))
            })
            .collect()
    };

    if let Some(spec) = spec {
        for decl in spec.branches.iter().filter(|b| !b.dynamic) {
            if slots.iter().any(|(k, _)| *k == decl.name) {
                continue;
            }
            let slot = match decl.shape {
                BranchShape::Plain => Slot::branch(None),
                BranchShape::Handler => Slot::handler(None),
            };
            slots.push((decl.name.clone(), slot));
        }
    }
    slots
}

/// Appends a new node to `workflow` and returns the document with its id.
pub fn create_node(
    doc: &str,
    workflow: &str,
    template: &NodeTemplate,
    schema: &ConstructSchema,
) -> EditResult<(String, String)> {
    let slots = template_slots(template, schema);
    create_node_with(doc, workflow, &template.name, slots, schema)
}

/// Like [`create_node`] with explicit input slots.
pub fn create_node_with(
    doc: &str,
    workflow: &str,
    opcode: &str,
    slots: Vec<(String, Slot)>,
    schema: &ConstructSchema,
) -> EditResult<(String, String)> {
    let mut lines = Lines::parse(doc);
    let span = locator::workflow_span(lines.as_slice(), workflow)
        .ok_or_else(|| EditError::not_found(workflow))?;
    let nodes = locator::workflow_block(lines.as_slice(), &span, "nodes")
        .ok_or_else(|| EditError::not_found(format!("{}.nodes", workflow)))?;

    let id = fresh_id(&lines, &schema.id_prefix(opcode));
    insert_children(&mut lines, &nodes, None, |column| {
        render_node(&id, opcode, None, &slots, column)
    })?;
    debug!(workflow, node = %id, opcode, "Node created");
    Ok((lines.render(), id))
}

/// Removes a node's block. References to it elsewhere are left dangling.
pub fn delete_node(doc: &str, id: &str) -> EditResult {
    if id == START {
        return Err(EditError::Reserved(id.to_string()));
    }
    let mut lines = Lines::parse(doc);
    let block = node_block(&lines, id)?;
    lines.remove(block.range());
    debug!(node = id, "Node deleted");
    Ok(lines.render())
}

/// Copies a node under a fresh `<id>_copy[_n]` id, right after the
/// original. The copy's `next` is reset; reporter references are shared.
pub fn duplicate_node(doc: &str, id: &str) -> EditResult<(String, String)> {
    if id == START {
        return Err(EditError::Reserved(id.to_string()));
    }
    let mut lines = Lines::parse(doc);
    let block = node_block(&lines, id)?;

    let taken = locator::node_ids(lines.as_slice());
    let mut copy_id = format!("{}_copy", id);
    let mut n = 2;
    while taken.contains(&copy_id) {
        copy_id = format!("{}_copy_{}", id, n);
        n += 1;
    }

    let copy = if block.is_header() {
        let mut copy = lines.slice(block.range());
        copy[0] = format!("{}{}:", " ".repeat(block.indent), format_string(&copy_id));
        if let Some(next) = locator::child(lines.as_slice(), &block, "next") {
            let offset = next.start - block.start;
            copy[offset] = format!("{}next: null", " ".repeat(next.indent));
            copy.drain(offset + 1..offset + (next.end - next.start));
        }
        copy
    } else {
        inline_copy(&lines, &block, &copy_id)?
    };

    lines.insert(block.end, copy);
    debug!(node = id, copy = %copy_id, "Node duplicated");
    Ok((lines.render(), copy_id))
}

/// Block-form copy of an inline node (`n: { opcode: x, ... }`).
fn inline_copy(lines: &Lines, block: &locator::Block, copy_id: &str) -> EditResult<Vec<String>> {
    let ambiguous = || EditError::AmbiguousShape {
        node: block.key.clone(),
        label: "inputs".to_string(),
    };
    let node = read_node(lines.as_slice(), block).ok_or_else(ambiguous)?;
    let slots = node
        .inputs
        .iter()
        .map(|(key, raw)| classify(raw).map(|slot| (key.clone(), slot)))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(ambiguous)?;
    Ok(render_node(copy_id, &node.opcode, None, &slots, block.indent))
}

/// Points `from.next` at `to` (or `null`), replacing the existing line in
/// place or inserting it as the node's first property.
pub fn set_next(doc: &str, from: &str, to: Option<&str>) -> EditResult {
    write_next(doc, None, from, to)
}

/// [`set_next`] for a node of one workflow. Needed to reach any `start`
/// but the first.
pub fn set_next_in(doc: &str, workflow: &str, from: &str, to: Option<&str>) -> EditResult {
    write_next(doc, Some(workflow), from, to)
}

fn write_next(doc: &str, workflow: Option<&str>, from: &str, to: Option<&str>) -> EditResult {
    let mut lines = Lines::parse(doc);
    let block = node_block_in(&lines, workflow, from)?;
    if !block.is_header() {
        return Err(EditError::AmbiguousShape {
            node: from.to_string(),
            label: "next".to_string(),
        });
    }
    let target = to.map(format_string).unwrap_or_else(|| "null".to_string());

    match locator::child(lines.as_slice(), &block, "next") {
        Some(next) => {
            let line = format!("{}next: {}", " ".repeat(next.indent), target);
            lines.replace(next.range(), vec![line]);
        }
        None => {
            let column = locator::child_indent(lines.as_slice(), &block);
            let line = format!("{}next: {}", " ".repeat(column), target);
            lines.insert(block.start + 1, vec![line]);
        }
    }
    Ok(lines.render())
}

pub fn clear_next(doc: &str, from: &str) -> EditResult {
    set_next(doc, from, None)
}

//! Indentation-aware block locator.
//!
//! A block starts at a `key:` line and runs through its last descendant,
//! i.e. up to (not including) the next non-blank, non-comment line whose
//! indentation is less than or equal to the header's. Blank lines and
//! comments never end a block, but trailing ones are not part of it.
//!
//! This module is the only place that derives line ranges. Commands ask it
//! for blocks and then splice the returned ranges.

use std::ops::Range;

use crate::document::format::unquote;
use crate::document::{INDENT, Lines};

/// A located `key:` entry. `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub key: String,
    pub start: usize,
    pub end: usize,
    pub indent: usize,
    /// Text after the colon for `key: value` lines, `None` for headers.
    pub inline: Option<String>,
}

impl Block {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn body(&self) -> Range<usize> {
        self.start + 1..self.end
    }

    pub fn is_header(&self) -> bool {
        self.inline.is_none()
    }

    /// `key: {}`, `key: []`, `key: null` and `key: ~`.
    pub fn is_empty_inline(&self) -> bool {
        matches!(
            self.inline.as_deref().map(|s| s.replace(' ', "")).as_deref(),
            Some("{}") | Some("[]") | Some("null") | Some("~")
        )
    }
}

/// One `- name: ...` entry of the top-level `workflows:` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSpan {
    pub name: String,
    pub start: usize,
    pub end: usize,
    /// Column of the `-` marker.
    pub indent: usize,
    /// Column of the workflow's own keys (`interface`, `variables`, `nodes`).
    pub prop_indent: usize,
}

impl WorkflowSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

pub fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

pub fn is_ignorable(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with('#')
}

fn is_list_item(line: &str) -> bool {
    let t = line.trim_start();
    t == "-" || t.starts_with("- ")
}

/// Splits `key: rest` on a line (indentation ignored). Quoted keys are
/// unquoted; a trailing comment is dropped from `rest`.
pub fn split_key(line: &str) -> Option<(String, String)> {
    let t = line.trim();
    if t.is_empty() || t.starts_with('#') || is_list_item(t) {
        return None;
    }

    let (raw_key, after) = if t.starts_with('"') || t.starts_with('\'') {
        let close = closing_quote(t)?;
        (&t[..=close], &t[close + 1..])
    } else {
        let colon = plain_key_colon(t)?;
        (&t[..colon], &t[colon..])
    };

    let after = after.trim_start().strip_prefix(':')?;
    if !(after.is_empty() || after.starts_with(' ') || after.starts_with('\t')) {
        return None;
    }
    let key = unquote(raw_key.trim());
    if key.is_empty() {
        return None;
    }
    Some((key, strip_comment(after.trim()).to_string()))
}

fn plain_key_colon(t: &str) -> Option<usize> {
    let bytes = t.as_bytes();
    (0..bytes.len()).find(|&i| {
        bytes[i] == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' ' || bytes[i + 1] == b'\t')
    })
}

fn closing_quote(t: &str) -> Option<usize> {
    let quote = t.as_bytes()[0];
    let bytes = t.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            b'\'' if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') => i += 2,
            b if b == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn strip_comment(rest: &str) -> &str {
    if rest.starts_with('#') {
        return "";
    }
    let mut quote: Option<char> = None;
    let mut prev = ' ';
    for (i, c) in rest.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' && prev.is_whitespace() => return rest[..i].trim_end(),
            None => {}
        }
        prev = c;
    }
    rest
}

/// Exclusive end of the block headed at `start`.
///
/// With `compact_seq`, list items at the header's own column are treated
/// as children (`key:` followed by `- item` at the same indentation).
pub fn block_end(lines: &[String], start: usize, indent: usize, compact_seq: bool) -> usize {
    let mut end = start + 1;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if is_ignorable(line) {
            continue;
        }
        let ind = indent_of(line);
        if ind > indent || (compact_seq && ind == indent && is_list_item(line)) {
            end = i + 1;
        } else {
            break;
        }
    }
    end
}

/// Reads the `key:` entry starting at line `index`.
pub fn entry_at(lines: &[String], index: usize) -> Option<Block> {
    let line = lines.get(index)?;
    let (key, rest) = split_key(line)?;
    let indent = indent_of(line);
    let header = rest.is_empty();
    Some(Block {
        key,
        start: index,
        end: block_end(lines, index, indent, header),
        indent,
        inline: if header { None } else { Some(rest) },
    })
}

/// First header line named `name` inside `range`.
pub fn find_block_in(lines: &[String], name: &str, range: Range<usize>) -> Option<Block> {
    let limit = range.end.min(lines.len());
    (range.start..limit).find_map(|i| {
        let block = entry_at(lines, i)?;
        (block.key == name && block.is_header()).then(|| Block {
            end: block.end.min(limit),
            ..block
        })
    })
}

/// Locates a named block, optionally scoped to one workflow.
///
/// Returns `None` when no header line matches; that is the only failure.
pub fn find_block(doc: &str, name: &str, scope: Option<&str>) -> Option<Block> {
    let lines = Lines::parse(doc);
    let lines = lines.as_slice();
    let range = match scope {
        Some(workflow) => workflow_span(lines, workflow)?.range(),
        None => 0..lines.len(),
    };
    find_block_in(lines, name, range)
}

/// Column used by the direct children of `parent`.
pub fn child_indent(lines: &[String], parent: &Block) -> usize {
    if parent.is_header() {
        if let Some(line) = lines[parent.body()].iter().find(|l| !is_ignorable(l)) {
            return indent_of(line);
        }
    }
    parent.indent + INDENT
}

/// Direct `key:` children of a header block, in document order.
pub fn children(lines: &[String], parent: &Block) -> Vec<Block> {
    if !parent.is_header() {
        return Vec::new();
    }
    let column = child_indent(lines, parent);
    let mut out = Vec::new();
    let mut i = parent.start + 1;
    while i < parent.end {
        let line = &lines[i];
        if !is_ignorable(line) && indent_of(line) == column {
            if let Some(entry) = entry_at(lines, i) {
                let end = entry.end.min(parent.end);
                i = end;
                out.push(Block { end, ..entry });
                continue;
            }
        }
        i += 1;
    }
    out
}

pub fn child(lines: &[String], parent: &Block, key: &str) -> Option<Block> {
    children(lines, parent).into_iter().find(|c| c.key == key)
}

/// All entries of the top-level `workflows:` list.
pub fn workflows(lines: &[String]) -> Vec<WorkflowSpan> {
    let Some(root) = find_block_in(lines, "workflows", 0..lines.len()) else {
        return Vec::new();
    };
    let Some(item_indent) = lines[root.body()]
        .iter()
        .find(|l| !is_ignorable(l))
        .map(|l| indent_of(l))
    else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut i = root.start + 1;
    while i < root.end {
        let line = &lines[i];
        if is_ignorable(line) || indent_of(line) != item_indent || !is_list_item(line) {
            i += 1;
            continue;
        }
        let end = block_end(lines, i, item_indent, false).min(root.end);
        let after_dash = &line[item_indent + 1..];
        let prop_indent = item_indent + 1 + indent_of(after_dash);
        let name = split_key(after_dash)
            .filter(|(k, _)| k == "name")
            .map(|(_, v)| unquote(&v))
            .or_else(|| {
                (i + 1..end)
                    .filter(|&j| indent_of(&lines[j]) == prop_indent)
                    .filter_map(|j| split_key(&lines[j]))
                    .find(|(k, _)| k == "name")
                    .map(|(_, v)| unquote(&v))
            });
        if let Some(name) = name {
            out.push(WorkflowSpan {
                name,
                start: i,
                end,
                indent: item_indent,
                prop_indent,
            });
        }
        i = end;
    }
    out
}

pub fn workflow_span(lines: &[String], name: &str) -> Option<WorkflowSpan> {
    workflows(lines).into_iter().find(|w| w.name == name)
}

/// One of a workflow's own keys: `interface`, `variables` or `nodes`.
pub fn workflow_block(lines: &[String], workflow: &WorkflowSpan, key: &str) -> Option<Block> {
    (workflow.start + 1..workflow.end).find_map(|i| {
        let line = &lines[i];
        if is_ignorable(line) || indent_of(line) != workflow.prop_indent {
            return None;
        }
        let entry = entry_at(lines, i)?;
        (entry.key == key).then(|| Block {
            end: entry.end.min(workflow.end),
            ..entry
        })
    })
}

/// Node blocks of one workflow, in document order.
pub fn workflow_nodes(lines: &[String], workflow: &WorkflowSpan) -> Vec<Block> {
    workflow_block(lines, workflow, "nodes")
        .map(|nodes| children(lines, &nodes))
        .unwrap_or_default()
}

/// Finds a node anywhere in the document. Only direct children of a
/// `nodes` block count, so input keys never shadow node ids.
pub fn locate_node(lines: &[String], id: &str) -> Option<(WorkflowSpan, Block)> {
    workflows(lines).into_iter().find_map(|wf| {
        let node = workflow_nodes(lines, &wf).into_iter().find(|n| n.key == id)?;
        Some((wf, node))
    })
}

/// Every node id in the document.
pub fn node_ids(lines: &[String]) -> Vec<String> {
    workflows(lines)
        .iter()
        .flat_map(|wf| workflow_nodes(lines, wf))
        .map(|b| b.key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_key_variants() {
        assert_eq!(split_key("  next: a1"), Some(("next".into(), "a1".into())));
        assert_eq!(split_key("  inputs:"), Some(("inputs".into(), "".into())));
        assert_eq!(split_key("  inputs:  # none yet"), Some(("inputs".into(), "".into())));
        assert_eq!(split_key("  \"a: b\": 1"), Some(("a: b".into(), "1".into())));
        assert_eq!(split_key("  url: http://x"), Some(("url".into(), "http://x".into())));
        assert_eq!(split_key("  - name: main"), None);
        assert_eq!(split_key("  # comment: here"), None);
    }

    #[test]
    fn test_strip_comment_respects_quotes() {
        assert_eq!(strip_comment("\"a # b\" # c"), "\"a # b\"");
        assert_eq!(strip_comment("x#y"), "x#y");
    }
}

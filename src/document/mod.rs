//! Line-oriented view of a workflow document.
//!
//! The document is never kept as a parsed tree. Every command re-reads the
//! slice it needs through [`locator`] and rewrites it through [`Lines`].

pub mod format;
pub mod locator;
pub mod read;

use std::ops::Range;

/// Indentation step used for every line the engine writes.
pub const INDENT: usize = 2;

/// Mutable line buffer used to splice ranges of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lines {
    lines: Vec<String>,
    trailing_newline: bool,
    /// Terminator of the first line; every rendered line uses it.
    newline: &'static str,
}

impl Lines {
    pub fn parse(text: &str) -> Self {
        let crlf = text
            .find('\n')
            .is_some_and(|i| text[..i].ends_with('\r'));
        Self {
            lines: text.lines().map(|l| l.trim_end_matches('\r').to_string()).collect(),
            trailing_newline: text.ends_with('\n') || text.is_empty(),
            newline: if crlf { "\r\n" } else { "\n" },
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Copies a range of lines out of the buffer.
    pub fn slice(&self, range: Range<usize>) -> Vec<String> {
        self.lines[range].to_vec()
    }

    pub fn replace(&mut self, range: Range<usize>, replacement: Vec<String>) {
        self.lines.splice(range, replacement);
    }

    pub fn insert(&mut self, at: usize, new_lines: Vec<String>) {
        let at = at.min(self.lines.len());
        self.lines.splice(at..at, new_lines);
    }

    pub fn remove(&mut self, range: Range<usize>) {
        self.lines.drain(range);
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join(self.newline);
        if self.trailing_newline && !out.is_empty() {
            out.push_str(self.newline);
        }
        out
    }
}

/// Re-indents a block so that its least indented line sits at `indent`.
/// Blank lines stay blank.
pub fn rebase(block: &[String], indent: usize) -> Vec<String> {
    let base = block
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| locator::indent_of(l))
        .min()
        .unwrap_or(0);
    let pad = " ".repeat(indent);
    block
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, &line[base.min(locator::indent_of(line))..])
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_keeps_trailing_newline() {
        let lines = Lines::parse("a:\n  b: 1\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.render(), "a:\n  b: 1\n");

        let lines = Lines::parse("a: 1");
        assert_eq!(lines.render(), "a: 1");
    }

    #[test]
    fn test_render_keeps_crlf_endings() {
        let mut lines = Lines::parse("a:\r\n  b: 1\r\n");
        assert_eq!(lines.get(1), Some("  b: 1"));
        lines.insert(2, vec!["  c: 2".to_string()]);
        assert_eq!(lines.render(), "a:\r\n  b: 1\r\n  c: 2\r\n");
    }

    #[test]
    fn test_rebase_shifts_relative_indentation() {
        let block = vec![
            "      n1:".to_string(),
            "        opcode: x".to_string(),
            "".to_string(),
        ];
        let out = rebase(&block, 2);
        assert_eq!(out, vec!["  n1:", "    opcode: x", ""]);
    }
}

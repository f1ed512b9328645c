// Base extractor types shared by every language implementation
//
// Language extractors walk a tree-sitter tree and emit `Entity` values. The
// helpers here handle the parts that are identical across languages: node text,
// line spans, qualified-name construction and leading comment blocks.

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

/// Kind of graph node an entity becomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Module,
    Type,
    Function,
    Method,
}

/// The scope that defines an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    /// Defined directly by the module of the file being extracted
    Module,
    /// Defined by the type with this qualified name (possibly in another file)
    Type(String),
}

/// One entity defined by a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    /// Globally unique handle, scope chain joined by the language separator
    pub qualified_name: String,
    /// Local name as written in the source
    pub name: String,
    /// 1-based, inclusive
    pub start_line: u32,
    /// 1-based, inclusive
    pub end_line: u32,
    pub docstring: Option<String>,
    pub owner: Owner,
    /// False for bodiless declarations (prototypes, member declarations)
    pub is_definition: bool,
}

/// Per-language naming and documentation conventions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRuleset {
    /// Joins scope segments, e.g. `.` for Python, `::` for C++
    pub scope_separator: &'static str,
    /// Whether qualified names start with the module's qualified name
    pub module_prefixed: bool,
}

/// Everything an extractor knows about the file it is walking
#[derive(Debug, Clone)]
pub struct FileContext {
    /// Repository-relative, Unix-style path
    pub relative_path: String,
    /// Qualified name of the module this file defines
    pub module_name: String,
    pub content: String,
}

/// Shared helpers for language extractors
pub struct BaseExtractor<'a> {
    pub context: &'a FileContext,
    pub ruleset: &'a LanguageRuleset,
}

impl<'a> BaseExtractor<'a> {
    pub fn new(context: &'a FileContext, ruleset: &'a LanguageRuleset) -> Self {
        Self { context, ruleset }
    }

    /// Get text from a tree-sitter node
    pub fn node_text(&self, node: &Node) -> String {
        let bytes = self.context.content.as_bytes();
        let (start, end) = (node.start_byte(), node.end_byte());
        if start <= end && end <= bytes.len() {
            String::from_utf8_lossy(&bytes[start..end]).to_string()
        } else {
            String::new()
        }
    }

    /// Text of a named field, if present
    pub fn field_text(&self, node: &Node, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|child| self.node_text(&child))
    }

    /// Build a qualified name from the enclosing scope chain and a local name
    pub fn qualify(&self, scope: &[String], name: &str) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(scope.len() + 2);
        if self.ruleset.module_prefixed && !self.context.module_name.is_empty() {
            parts.push(&self.context.module_name);
        }
        parts.extend(scope.iter().map(String::as_str));
        parts.push(name);
        parts.join(self.ruleset.scope_separator)
    }

    /// Create an entity spanning `node`
    pub fn create_entity(
        &self,
        node: &Node,
        kind: EntityKind,
        name: String,
        qualified_name: String,
        owner: Owner,
        is_definition: bool,
        docstring: Option<String>,
    ) -> Entity {
        let (start_line, end_line) = line_span(node);
        Entity {
            kind,
            qualified_name,
            name,
            start_line,
            end_line,
            docstring,
            owner,
            is_definition,
        }
    }

    /// Contiguous comment block immediately preceding `node`
    ///
    /// Sibling kinds listed in `skip` (attributes, decorators) may sit between
    /// the comments and the node. A blank line ends the block.
    pub fn leading_comment_block(&self, node: &Node, skip: &[&str]) -> Option<String> {
        self.leading_comment_block_where(node, skip, |_| true)
    }

    /// `leading_comment_block` keeping only comments that pass `accept`
    ///
    /// Rejected comments still count toward adjacency but add no text.
    pub fn leading_comment_block_where<F>(
        &self,
        node: &Node,
        skip: &[&str],
        accept: F,
    ) -> Option<String>
    where
        F: Fn(&Node) -> bool,
    {
        let mut comments: Vec<String> = Vec::new();
        let mut expected_row = node.start_position().row;
        let mut current = node.prev_sibling();

        while let Some(sibling) = current {
            let kind = sibling.kind();
            if skip.contains(&kind) {
                expected_row = sibling.start_position().row;
                current = sibling.prev_sibling();
                continue;
            }
            if !kind.contains("comment") {
                break;
            }
            // Comment must end on the line right above (or the same line as) what follows it
            let end_row = sibling.end_position().row;
            if end_row + 1 < expected_row {
                break;
            }
            if accept(&sibling) {
                comments.push(self.node_text(&sibling));
            }
            expected_row = sibling.start_position().row;
            current = sibling.prev_sibling();
        }

        if comments.is_empty() {
            return None;
        }
        comments.reverse();
        let text = strip_comment_markers(&comments.join("\n"));
        if text.is_empty() { None } else { Some(text) }
    }
}

/// 1-based inclusive line span of a node
///
/// A node that ends at column 0 stops on the previous line (tree-sitter reports
/// the position just past a trailing newline).
pub fn line_span(node: &Node) -> (u32, u32) {
    let start = node.start_position();
    let end = node.end_position();
    let start_line = start.row as u32 + 1;
    let mut end_line = end.row as u32 + 1;
    if end.column == 0 && end.row > start.row {
        end_line -= 1;
    }
    (start_line, end_line.max(start_line))
}

/// Remove `//`, `///`, `//!`, `/* */` and leading `*` decoration from a comment block
pub fn strip_comment_markers(raw: &str) -> String {
    let mut lines = Vec::new();
    for line in raw.lines() {
        let mut text = line.trim();
        for prefix in ["///", "//!", "//", "/**", "/*!", "/*"] {
            if let Some(rest) = text.strip_prefix(prefix) {
                text = rest;
                break;
            }
        }
        if let Some(rest) = text.strip_suffix("*/") {
            text = rest;
        }
        let text = text.trim();
        let text = text.strip_prefix('*').map(str::trim_start).unwrap_or(text);
        lines.push(text.to_string());
    }

    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

//! Syntax-aware extraction of retrievable code units from Python sources.
//!
//! A source file is parsed with tree-sitter and every function definition,
//! async function definition, and class definition in the tree becomes one
//! [`CodeUnit`]: a contiguous, verbatim slice of the file together with its
//! declared name and leading docstring. Units are the atomic entities that
//! the retrieval pipeline embeds and searches over.
//!
//! The walk recurses into every node, so nested functions and class methods
//! are emitted as their own units in addition to their enclosing definition.
//! A unit's span runs from its start line through the maximum end line over
//! the node and all of its descendants (tree-sitter end positions already
//! fold descendants in), with trailing blank lines trimmed.

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser};
use uuid::Uuid;

/// The syntactic category of a [`CodeUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    Function,
    AsyncFunction,
    Class,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Function => "function",
            UnitKind::AsyncFunction => "async-function",
            UnitKind::Class => "class",
        }
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrievable source fragment with identity and provenance.
///
/// Created once per extraction pass and immutable thereafter; a re-ingestion
/// discards and rebuilds all units for a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeUnit {
    /// Unique id assigned at extraction time.
    pub id: String,
    /// Path of the originating source file, relative or absolute per caller.
    pub filename: String,
    /// Declared identifier, absent for anonymous constructs.
    pub name: Option<String>,
    pub kind: UnitKind,
    /// Leading documentation string, cleaned of common indentation.
    pub docstring: Option<String>,
    /// Verbatim source text of the unit's inclusive line span.
    pub code: String,
    /// 1-based first line of the unit in the source file.
    pub start_line: usize,
    /// 1-based last line of the unit in the source file.
    pub end_line: usize,
}

/// Errors raised while extracting units from a single file.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The bundled Python grammar could not be loaded into the parser.
    #[error("failed to load the Python grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    /// The source did not parse cleanly; the file contributes zero units.
    #[error("failed to parse {filename}: source contains syntax errors")]
    ParseFailed { filename: String },
}

/// Parse `source` and return every function, async function, and class as a
/// [`CodeUnit`], in pre-order discovery order.
///
/// A file that fails to parse returns [`ExtractError::ParseFailed`] and
/// contributes zero units; callers are expected to report the error and
/// continue with the next file. Units whose extracted text is empty after
/// trimming whitespace are discarded.
pub fn extract_units(source: &str, filename: &str) -> Result<Vec<CodeUnit>, ExtractError> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_python::LANGUAGE.into())?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ExtractError::ParseFailed {
            filename: filename.to_string(),
        })?;

    // tree-sitter is error-tolerant, but a tree with error nodes means the
    // file is not valid Python; treat it the same as a parse failure.
    if tree.root_node().has_error() {
        return Err(ExtractError::ParseFailed {
            filename: filename.to_string(),
        });
    }

    let lines: Vec<&str> = source.lines().collect();
    let mut units = Vec::new();
    collect_units(tree.root_node(), source, &lines, filename, &mut units);
    Ok(units)
}

/// Pre-order walk over the whole tree. Recursion continues into unit nodes
/// so that methods and nested definitions are discovered as their own units.
fn collect_units(
    node: Node<'_>,
    source: &str,
    lines: &[&str],
    filename: &str,
    units: &mut Vec<CodeUnit>,
) {
    if let Some(kind) = unit_kind(node) {
        if let Some(unit) = build_unit(node, kind, source, lines, filename) {
            units.push(unit);
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_units(child, source, lines, filename, units);
    }
}

fn unit_kind(node: Node<'_>) -> Option<UnitKind> {
    match node.kind() {
        "function_definition" => {
            if is_async(node) {
                Some(UnitKind::AsyncFunction)
            } else {
                Some(UnitKind::Function)
            }
        }
        "class_definition" => Some(UnitKind::Class),
        _ => None,
    }
}

/// An async def is a `function_definition` prefixed by the `async` keyword.
fn is_async(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == "async")
}

fn build_unit(
    node: Node<'_>,
    kind: UnitKind,
    source: &str,
    lines: &[&str],
    filename: &str,
) -> Option<CodeUnit> {
    let start = node.start_position().row;
    // The node's end position already covers every descendant, so this is
    // the maximum end line over the node and all nodes beneath it.
    let end = node.end_position().row.min(lines.len().saturating_sub(1));
    if start > end {
        return None;
    }

    let mut span = lines[start..=end].to_vec();
    while span.last().is_some_and(|line| line.trim().is_empty()) {
        span.pop();
    }
    let code = span.join("\n");
    if code.trim().is_empty() {
        return None;
    }

    Some(CodeUnit {
        id: Uuid::new_v4().to_string(),
        filename: filename.to_string(),
        name: declared_name(node, source),
        kind,
        docstring: docstring(node, source),
        end_line: start + span.len(),
        start_line: start + 1,
        code,
    })
}

fn declared_name(node: Node<'_>, source: &str) -> Option<String> {
    let name_node = node.child_by_field_name("name")?;
    Some(node_text(name_node, source).to_string())
}

/// The docstring is the first statement of the body when that statement is a
/// plain string literal.
fn docstring(node: Node<'_>, source: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }

    let mut content = String::new();
    let mut cursor = expr.walk();
    for child in expr.children(&mut cursor) {
        if child.kind() == "string_content" {
            content.push_str(node_text(child, source));
        }
    }

    let cleaned = clean_docstring(&content);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Strip the common leading indentation that a docstring inherits from its
/// surrounding block, the way Python's `ast.get_docstring` does.
fn clean_docstring(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.trim_start()
            } else {
                line.get(margin..).unwrap_or("")
            }
        })
        .collect();

    while cleaned.first().is_some_and(|line| line.trim().is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|line| line.trim().is_empty()) {
        cleaned.pop();
    }

    cleaned.join("\n").trim_end().to_string()
}

fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

//! Concrete syntax trees from tree-sitter.
//!
//! Every other module in [`crate::python`] reads source through the trees
//! built here. Nodes carry byte ranges into the parsed text, so callers
//! slice the original source instead of re-rendering it.

use std::collections::BTreeSet;

use tree_sitter::{Node, Parser, Tree};

use crate::error::{Error, Result};

/// Parse `source` without validating it. tree-sitter always produces a
/// tree; broken input shows up as `ERROR` and `MISSING` nodes.
pub(crate) fn parse_lenient(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| Error::parse(1, format!("failed to load the Python grammar: {e}")))?;
    parser
        .parse(source, None)
        .ok_or_else(|| Error::parse(1, "parser gave no tree"))
}

/// Parse `source`, failing on the first syntax error.
pub(crate) fn parse(source: &str) -> Result<Tree> {
    let tree = parse_lenient(source)?;
    check(tree.root_node(), source)?;
    Ok(tree)
}

fn check(root: Node<'_>, source: &str) -> Result<()> {
    if root.has_error() {
        if let Some(node) = first_error(root) {
            return Err(describe_error(node, source));
        }
        return Err(Error::parse(root.start_position().row + 1, "invalid syntax"));
    }
    // The grammar accepts a header followed by a bare newline as an empty
    // block, which Python rejects.
    match descendants(root).into_iter().find(|n| n.kind() == "block" && statements(*n).is_empty()) {
        Some(block) => Err(Error::parse(
            block.start_position().row + 1,
            "expected an indented block",
        )),
        None => Ok(()),
    }
}

/// First `ERROR` or `MISSING` node in source order.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn describe_error(node: Node<'_>, source: &str) -> Error {
    let line = node.start_position().row + 1;
    if node.is_missing() {
        return Error::parse(line, format!("expected `{}`", node.kind()));
    }
    let snippet = text(node, source).lines().next().unwrap_or("").trim();
    if snippet.is_empty() {
        Error::parse(line, "invalid syntax")
    } else {
        Error::parse(line, format!("invalid syntax at `{snippet}`"))
    }
}

/// Source text of a node.
pub(crate) fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// Named children, comments excluded.
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

/// All children, anonymous tokens included.
pub(crate) fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Statements of a module or block.
pub(crate) fn statements(node: Node<'_>) -> Vec<Node<'_>> {
    named_children(node)
}

/// Named nodes under `root`, in source order, `root` first.
pub(crate) fn descendants(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    out
}

/// The single expression of a one-statement source, parentheses kept.
pub(crate) fn single_expression(root: Node<'_>) -> Option<Node<'_>> {
    match statements(root).as_slice() {
        [statement] if statement.kind() == "expression_statement" => {
            match named_children(*statement).as_slice() {
                [expression] => Some(*expression),
                _ => None,
            }
        }
        _ => None,
    }
}

/// 0-based row of the last line a node occupies, ignoring trailing
/// comments the grammar attaches to blocks.
pub(crate) fn end_row(node: Node<'_>) -> usize {
    let last = children(node)
        .into_iter()
        .filter(|c| c.kind() != "comment" && c.end_byte() > c.start_byte())
        .last();
    match last {
        Some(child) => end_row(child),
        None => {
            let end = node.end_position();
            if end.column == 0 && end.row > node.start_position().row {
                end.row - 1
            } else {
                end.row
            }
        }
    }
}

/// 0-based rows that continue a multi-line string.
pub(crate) fn string_rows(root: Node<'_>) -> BTreeSet<usize> {
    descendants(root)
        .into_iter()
        .filter(|n| n.kind() == "string")
        .flat_map(|n| n.start_position().row + 1..=n.end_position().row)
        .collect()
}

/// Dotted path of a name or attribute chain (`dg.asset` gives
/// `["dg", "asset"]`).
pub(crate) fn dotted_path(node: Node<'_>, source: &str) -> Option<Vec<String>> {
    match node.kind() {
        "identifier" => Some(vec![text(node, source).to_string()]),
        "attribute" => {
            let mut path = dotted_path(node.child_by_field_name("object")?, source)?;
            path.push(text(node.child_by_field_name("attribute")?, source).to_string());
            Some(path)
        }
        _ => None,
    }
}

/// True if `node` is the `field` child of its parent.
pub(crate) fn is_field_of(node: Node<'_>, parent_kind: &str, field: &str) -> bool {
    node.parent().is_some_and(|parent| {
        parent.kind() == parent_kind && parent.child_by_field_name(field) == Some(node)
    })
}

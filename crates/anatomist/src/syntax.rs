//! Small tree-sitter helpers shared by the candidate view, the filter chain
//! and the oracle.

use tree_sitter::Node;

/// Text of `node` in `source`, or `""` if the range is not valid UTF-8.
pub fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> &'s str {
    std::str::from_utf8(&source[node.start_byte()..node.end_byte()]).unwrap_or("")
}

/// Strips every layer of `( … )` around an expression.
pub fn unwrap_parens(mut node: Node<'_>) -> Node<'_> {
    while node.kind() == "parenthesized_expression" {
        match first_named_child(node) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Walks up through enclosing `( … )` and returns the outermost wrapper
/// (or `node` itself when it is not parenthesized).
pub fn outermost_parens(mut node: Node<'_>) -> Node<'_> {
    while let Some(parent) = node.parent() {
        if parent.kind() == "parenthesized_expression" {
            node = parent;
        } else {
            break;
        }
    }
    node
}

/// First named child that is not a comment.
pub fn first_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment");
    found
}

/// Last child of `node`, anonymous tokens included.
pub fn last_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let last = node.children(&mut cursor).last();
    last
}

/// Named children of `node`, comments excluded.
pub fn named_children_vec(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

/// The type written after `:` in a `type_annotation` node.
///
/// `": Promise<string>"` → `"Promise<string>"`.
pub fn type_annotation_text<'s>(annotation: Node<'_>, source: &'s [u8]) -> &'s str {
    let text = node_text(annotation, source).trim();
    text.strip_prefix(':').unwrap_or(text).trim()
}

/// Returns `true` if `node` is the field `field` of its parent.
pub fn is_field_of(node: Node<'_>, parent: Node<'_>, field: &str) -> bool {
    parent
        .child_by_field_name(field)
        .is_some_and(|f| f.id() == node.id())
}

/// Node kinds that introduce a new function scope.
pub fn is_function_like(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "generator_function_declaration"
            | "function_expression"
            | "function"
            | "generator_function"
            | "arrow_function"
            | "method_definition"
    )
}

/// 1-based (line, column) of the first byte of `node`.
pub fn location(node: Node<'_>) -> (u32, u32) {
    let pos = node.start_position();
    (pos.row as u32 + 1, pos.column as u32 + 1)
}

//! Locating named top-level constructs by exact identifier.
//!
//! Traversal uses an explicit stack rather than recursion, the same
//! shape as the ingestion pipeline's declaration collectors. Node kinds
//! matched per language are the closed set named in the component spec;
//! nothing outside function/class/method declarations is considered.

use tree_sitter::{Node, Tree};

use crate::language::LanguageKind;
use crate::span::ByteSpan;

/// A named top-level (or method-level) construct found in a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Construct {
    pub name: String,
    pub span: ByteSpan,
    /// Tree-sitter node kind, kept for diagnostics and tests.
    pub kind: &'static str,
    /// Kind of the immediate parent node, if any.
    pub parent_kind: Option<&'static str>,
}

/// Finds every construct in `tree` whose resolved name is in
/// `target_names`, in source order. Names not found are simply absent
/// from the result (empty-spans policy lives one layer up, in
/// mask-builder).
///
/// Nodes nested inside an already-matched ancestor are not revisited:
/// matching stops descending into the body of a matched construct, but
/// still walks its non-matching ancestors to find sibling/nested
/// matches (e.g. a target method inside a non-target class).
pub fn find_named_top_level_constructs(
    tree: &Tree,
    code: &str,
    lang: LanguageKind,
    target_names: &[String],
) -> Vec<Construct> {
    let root = tree.root_node();
    let mut out = Vec::new();
    let mut stack: Vec<Node> = vec![root];

    while let Some(node) = stack.pop() {
        if let Some((name, kind)) = match_construct(&node, code, lang) {
            if target_names.iter().any(|t| t == &name) {
                out.push(Construct {
                    name,
                    span: node_span(&node),
                    kind,
                    parent_kind: node.parent().map(|p| p.kind()),
                });
                // Matched: don't descend into this node's own body, but
                // its siblings (pushed before it by the parent level)
                // are still processed normally.
                continue;
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }

    out.sort_by_key(|c| c.span.start_byte);
    out
}

fn match_construct(node: &Node, code: &str, lang: LanguageKind) -> Option<(String, &'static str)> {
    let kind = node.kind();
    match lang {
        LanguageKind::Python => match kind {
            "function_definition" => name_field(node, code, "name").map(|n| (n, "function_definition")),
            "class_definition" => name_field(node, code, "name").map(|n| (n, "class_definition")),
            _ => None,
        },
        LanguageKind::JavaScript => match kind {
            "function_declaration" => {
                name_field(node, code, "name").map(|n| (n, "function_declaration"))
            }
            "class_declaration" => name_field(node, code, "name").map(|n| (n, "class_declaration")),
            "method_definition" => method_name(node, code).map(|n| (n, "method_definition")),
            _ => None,
        },
        LanguageKind::TypeScript => match kind {
            "function_declaration" => {
                name_field(node, code, "name").map(|n| (n, "function_declaration"))
            }
            "function_signature" => {
                name_field(node, code, "name").map(|n| (n, "function_signature"))
            }
            "class_declaration" => name_field(node, code, "name").map(|n| (n, "class_declaration")),
            "method_definition" => method_name(node, code).map(|n| (n, "method_definition")),
            _ => None,
        },
    }
}

fn name_field(node: &Node, code: &str, field: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| text(code, n))
}

/// Method names sit in a `property_identifier` child when there is no
/// `name` field, matching JS/TS class-body grammar shape.
fn method_name(node: &Node, code: &str) -> Option<String> {
    if let Some(n) = node.child_by_field_name("name") {
        return Some(text(code, n));
    }
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|c| c.kind() == "property_identifier")
        .map(|n| text(code, n))
}

fn text(code: &str, node: Node) -> String {
    code[node.byte_range()].to_string()
}

fn node_span(node: &Node) -> ByteSpan {
    let start = node.start_position();
    let end = node.end_position();
    ByteSpan::new(
        node.start_byte(),
        node.end_byte(),
        start.row,
        end.row,
        start.column,
        end.column,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse;

    #[test]
    fn finds_python_function_by_name() {
        let code = "def foo():\n    pass\n\ndef bar():\n    pass\n";
        let tree = parse(code, LanguageKind::Python).unwrap();
        let found =
            find_named_top_level_constructs(&tree, code, LanguageKind::Python, &["bar".to_string()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "bar");
        assert_eq!(found[0].kind, "function_definition");
    }

    #[test]
    fn missing_name_yields_empty_result() {
        let code = "def foo():\n    pass\n";
        let tree = parse(code, LanguageKind::Python).unwrap();
        let found = find_named_top_level_constructs(
            &tree,
            code,
            LanguageKind::Python,
            &["does_not_exist".to_string()],
        );
        assert!(found.is_empty());
    }

    #[test]
    fn finds_nested_method_inside_unmatched_class() {
        let code = "class Foo:\n    def target(self):\n        pass\n";
        let tree = parse(code, LanguageKind::Python).unwrap();
        let found = find_named_top_level_constructs(
            &tree,
            code,
            LanguageKind::Python,
            &["target".to_string()],
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "target");
    }

    #[test]
    fn finds_typescript_method_definition() {
        let code = "class Foo {\n  bar(): void {}\n}\n";
        let tree = parse(code, LanguageKind::TypeScript).unwrap();
        let found = find_named_top_level_constructs(
            &tree,
            code,
            LanguageKind::TypeScript,
            &["bar".to_string()],
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, "method_definition");
    }
}

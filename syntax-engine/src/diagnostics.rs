//! Syntax-error detection over a parsed tree.
//!
//! Generalizes `ASTMasker.validate_syntax`'s re-parse-and-inspect
//! approach from Python-only to all three supported languages: walk the
//! tree looking for error/missing nodes rather than trusting a boolean
//! "did it parse" flag, since Tree-sitter always produces *a* tree.

use tree_sitter::{Node, Tree};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// 0-indexed line, matching the original analyzer's reporting.
    pub line: usize,
    pub column: usize,
}

/// Returns every error/missing node found in `tree`, in document order.
/// An empty vec means the buffer re-parses cleanly.
pub fn has_errors(tree: &Tree) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let mut stack: Vec<Node> = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        if node.is_missing() {
            let pos = node.start_position();
            out.push(Diagnostic {
                severity: Severity::Error,
                message: format!("missing required {}", node.kind()),
                line: pos.row,
                column: pos.column,
            });
        } else if node.is_error() {
            let pos = node.start_position();
            out.push(Diagnostic {
                severity: Severity::Error,
                message: format!("syntax error in {}", node.kind()),
                line: pos.row,
                column: pos.column,
            });
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }

    out.sort_by_key(|d| (d.line, d.column));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageKind;
    use crate::tree::parse;

    #[test]
    fn clean_buffer_has_no_diagnostics() {
        let tree = parse("def f():\n    return 1\n", LanguageKind::Python).unwrap();
        assert!(has_errors(&tree).is_empty());
    }

    #[test]
    fn malformed_buffer_reports_an_error() {
        let tree = parse("def f(:\n    pass\n", LanguageKind::Python).unwrap();
        let diags = has_errors(&tree);
        assert!(!diags.is_empty());
    }
}

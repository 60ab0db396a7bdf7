//! The Validation Verdict sum type and diagnostic model shared by both
//! gate stages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationVerdict {
    Ok,
    SyntacticError { diagnostics: Vec<Diagnostic> },
    SemanticError { diagnostics: Vec<Diagnostic> },
    ToolingUnavailable,
}

impl ValidationVerdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationVerdict::Ok | ValidationVerdict::ToolingUnavailable)
    }

    /// A compact human-readable summary ("line N: msg; …") fed back
    /// into the next attempt's condition on failure.
    pub fn summary(&self) -> Option<String> {
        let diags = match self {
            ValidationVerdict::SyntacticError { diagnostics } => diagnostics,
            ValidationVerdict::SemanticError { diagnostics } => diagnostics,
            _ => return None,
        };
        Some(
            diags
                .iter()
                .map(|d| format!("line {}: {}", d.line, d.message))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tooling_unavailable_counts_as_ok() {
        assert!(ValidationVerdict::ToolingUnavailable.is_ok());
    }

    #[test]
    fn syntactic_error_is_not_ok_and_has_a_summary() {
        let v = ValidationVerdict::SyntacticError {
            diagnostics: vec![Diagnostic {
                line: 3,
                column: 1,
                message: "syntax error in block".to_string(),
                severity: Severity::Error,
            }],
        };
        assert!(!v.is_ok());
        assert_eq!(v.summary().unwrap(), "line 3: syntax error in block");
    }
}

//! Stage 1 — Syntactic validation: re-parse the candidate with the
//! declared language and surface any error/missing node.

use std::time::Instant;

use syntax_engine::{LanguageKind, Severity as EngineSeverity, has_errors, parse};
use tracing::debug;

use crate::verdict::{Diagnostic, Severity, ValidationVerdict};

pub struct SyntacticResult {
    pub verdict: ValidationVerdict,
    pub elapsed_ms: u64,
}

pub fn validate_syntax(candidate: &str, language: LanguageKind) -> SyntacticResult {
    let started = Instant::now();

    let verdict = match parse(candidate, language) {
        Ok(tree) => {
            let diags = has_errors(&tree);
            if diags.is_empty() {
                ValidationVerdict::Ok
            } else {
                ValidationVerdict::SyntacticError {
                    diagnostics: diags
                        .into_iter()
                        .map(|d| Diagnostic {
                            line: d.line,
                            column: d.column,
                            message: d.message,
                            severity: match d.severity {
                                EngineSeverity::Error => Severity::Error,
                            },
                        })
                        .collect(),
                }
            }
        }
        Err(e) => ValidationVerdict::SyntacticError {
            diagnostics: vec![Diagnostic {
                line: 0,
                column: 0,
                message: e.to_string(),
                severity: Severity::Error,
            }],
        },
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    debug!(?language, elapsed_ms, ok = verdict.is_ok(), "stage 1 syntactic validation complete");

    SyntacticResult { verdict, elapsed_ms }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_candidate_passes_stage_one() {
        let result = validate_syntax("def f():\n    return 1\n", LanguageKind::Python);
        assert_eq!(result.verdict, ValidationVerdict::Ok);
    }

    #[test]
    fn malformed_candidate_fails_stage_one() {
        let result = validate_syntax("def f(:\n    pass\n", LanguageKind::Python);
        assert!(!result.verdict.is_ok());
    }
}

//! The Patch artifact and the risk-scoring function (§3, §4.5).

use mask_builder::MaskSpan;
use safety_gate::ValidationVerdict;
use similar::TextDiff;

/// The final user-visible artifact. Immutable once emitted.
#[derive(Debug, Clone)]
pub struct Patch {
    pub original_source: String,
    pub generated_source: String,
    pub unified_diff: String,
    pub mask_spans: Vec<MaskSpan>,
    pub applicable: bool,
    pub risk_score: f64,
}

impl Patch {
    /// Composes the accepted patch: unified diff with three lines of
    /// context, risk score, and the `applicable` flag.
    pub fn accepted(
        path: &str,
        original_source: String,
        generated_source: String,
        mask_spans: Vec<MaskSpan>,
        verdict: &ValidationVerdict,
    ) -> Self {
        let unified_diff = unified_diff(path, &original_source, &generated_source);
        let changed_lines = count_changed_lines(&original_source, &generated_source);
        let risk_score = risk_score(true, verdict, changed_lines);
        let applicable = verdict.is_ok();

        Self {
            original_source,
            generated_source,
            unified_diff,
            mask_spans,
            applicable,
            risk_score,
        }
    }

    /// A patch for a rejected or hard-errored request: no diff, not
    /// applicable, risk pinned at 1.0.
    pub fn rejected(original_source: String, mask_spans: Vec<MaskSpan>) -> Self {
        Self {
            original_source: original_source.clone(),
            generated_source: original_source,
            unified_diff: String::new(),
            mask_spans,
            applicable: false,
            risk_score: 1.0,
        }
    }
}

/// Unified diff with three lines of context, `--- a/<path>` / `+++
/// b/<path>` headers, LF endings (§6 Patch format).
pub fn unified_diff(path: &str, original: &str, generated: &str) -> String {
    TextDiff::from_lines(original, generated)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

fn count_changed_lines(original: &str, generated: &str) -> usize {
    let diff = TextDiff::from_lines(original, generated);
    diff.iter_all_changes()
        .filter(|c| c.tag() != similar::ChangeTag::Equal)
        .count()
}

/// Lines added / removed between two buffers, for the ledger's
/// `file_modification` event.
pub fn line_changes(original: &str, generated: &str) -> (u32, u32) {
    let diff = TextDiff::from_lines(original, generated);
    let mut added = 0u32;
    let mut removed = 0u32;
    for change in diff.iter_all_changes() {
        match change.tag() {
            similar::ChangeTag::Insert => added += 1,
            similar::ChangeTag::Delete => removed += 1,
            similar::ChangeTag::Equal => {}
        }
    }
    (added, removed)
}

/// `+0.5` syntactic invalid, `+0.3` any validation error remains,
/// `+0.2` diff touches >100 changed lines, `+0.1` if >50. Capped at
/// 1.0. Semantic errors are folded into "any validation error remains"
/// rather than a separate weight (§9's Open Question resolution).
pub fn risk_score(syntax_valid: bool, verdict: &ValidationVerdict, changed_lines: usize) -> f64 {
    let mut score = 0.0;
    if !syntax_valid {
        score += 0.5;
    }
    if !verdict.is_ok() {
        score += 0.3;
    }
    if changed_lines > 100 {
        score += 0.2;
    } else if changed_lines > 50 {
        score += 0.1;
    }
    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use safety_gate::{Diagnostic, Severity};

    #[test]
    fn clean_accept_has_zero_risk() {
        let score = risk_score(true, &ValidationVerdict::Ok, 3);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn syntax_invalid_and_big_diff_caps_at_one() {
        let verdict = ValidationVerdict::SyntacticError {
            diagnostics: vec![Diagnostic {
                line: 1,
                column: 0,
                message: "bad".to_string(),
                severity: Severity::Error,
            }],
        };
        let score = risk_score(false, &verdict, 150);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn moderate_diff_adds_tenth() {
        let score = risk_score(true, &ValidationVerdict::Ok, 60);
        assert!((score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn unified_diff_carries_standard_headers() {
        let diff = unified_diff("a.py", "def f():\n    pass\n", "def f():\n    return 1\n");
        assert!(diff.contains("--- a/a.py"));
        assert!(diff.contains("+++ b/a.py"));
    }
}

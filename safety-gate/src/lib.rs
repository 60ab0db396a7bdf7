//! Safety Gate (Component 4): two-stage validation — syntactic via the
//! syntax engine, then semantic via an external type-checker.

pub mod semantic;
pub mod syntactic;
pub mod verdict;

pub use semantic::{Checker, SemanticResult, validate_semantics};
pub use syntactic::{SyntacticResult, validate_syntax};
pub use verdict::{Diagnostic, Severity, ValidationVerdict};

use std::path::Path;
use std::time::Duration;

use core_config::CheckerPreference;
use syntax_engine::LanguageKind;
use tracing::info;

/// Full gate pass: Stage 1 then, if it passes, Stage 2. Returns the
/// verdict that should drive the orchestrator's state transition.
pub struct GateOutcome {
    pub verdict: ValidationVerdict,
    pub stage1_elapsed_ms: u64,
    pub stage2_elapsed_ms: Option<u64>,
    pub checker_used: Option<&'static str>,
}

#[allow(clippy::too_many_arguments)]
pub async fn run_gate(
    candidate: &str,
    language: LanguageKind,
    temp_path: &Path,
    preference: CheckerPreference,
    probe_timeout: Duration,
    check_timeout: Duration,
) -> GateOutcome {
    let stage1 = validate_syntax(candidate, language);
    if !stage1.verdict.is_ok() {
        info!(?language, "stage 1 failed, skipping stage 2");
        return GateOutcome {
            verdict: stage1.verdict,
            stage1_elapsed_ms: stage1.elapsed_ms,
            stage2_elapsed_ms: None,
            checker_used: None,
        };
    }

    let stage2 = validate_semantics(
        candidate,
        language,
        temp_path,
        preference,
        probe_timeout,
        check_timeout,
    )
    .await;

    GateOutcome {
        verdict: stage2.verdict,
        stage1_elapsed_ms: stage1.elapsed_ms,
        stage2_elapsed_ms: Some(stage2.elapsed_ms),
        checker_used: stage2.checker_used,
    }
}

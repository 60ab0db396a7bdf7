//! Build Orchestrator (Component 5): drives one request end to end
//! through the `Masking -> Denoising -> ValidatingSyntax ->
//! ValidatingSemantics -> Accepted | Rejected_Retry |
//! Rejected_Exhausted | HardError` state machine (§4.5).

use core_config::RunConfig;
use denoising_driver::{Backbone, NoiseSchedule, run_single_pass, run_with_autoregressive_fallback};
use mask_builder::mask;
use provenance_ledger::Ledger;
use safety_gate::{ValidationVerdict, run_gate, validate_syntax};
use tracing::{info, warn};

use crate::backbone;
use crate::patch::{Patch, line_changes};
use crate::request::{Condition, RunRequest};

/// One of the named terminal states a request can end in, surfaced so
/// callers (and tests) can assert on it without re-deriving it from
/// the `Patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Accepted,
    RejectedExhausted,
    HardError,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub terminal: Terminal,
    pub patch: Patch,
    pub attempts: u32,
}

/// Drives `req` through the full state machine, logging every model
/// call, safety check and condition revision to `ledger`, and finally
/// finalizing it. Does not write the ledger to disk; see
/// [`provenance_ledger::Ledger::save`].
pub async fn run_request(req: &RunRequest, config: &RunConfig, ledger: &mut Ledger) -> RunOutcome {
    let backbone = backbone::resolve(config);
    run_request_with_backbone(req, config, ledger, &backbone).await
}

/// Same state machine as [`run_request`], but against a caller-supplied
/// backbone rather than one resolved from `config.diffusion_preset`.
/// Exists so tests can drive a scripted `MockBackbone` through the
/// full orchestrator (scenarios S3/S4) without faking the preset.
pub async fn run_request_with_backbone(
    req: &RunRequest,
    config: &RunConfig,
    ledger: &mut Ledger,
    backbone: &Backbone,
) -> RunOutcome {
    // Masking.
    let (masked_buffer, spans) = mask(&req.source, &req.target_names, req.language);
    if spans.is_empty() {
        warn!(file = %req.file_path, "masking found no matching constructs, hard error");
        ledger.log_error("no matching constructs found for requested target names");
        ledger.finalize(Some(false));
        return RunOutcome {
            terminal: Terminal::HardError,
            patch: Patch::rejected(req.source.clone(), spans),
            attempts: 0,
        };
    }

    let mut condition = Condition::new(&req.instruction, req.context_excerpt.as_deref());
    let schedule = NoiseSchedule::new(config.num_sampling_steps, config.noise_schedule);
    let max_attempts = config.max_retries + 1;

    // Total backbone invocations across every outer attempt — including
    // every inner autoregressive-fallback pass and its fallback call —
    // must never exceed `max_attempts` (§8.4). The autoregressive path
    // is handed the *remaining* budget each time, not the full bound,
    // so the two loops share one total rather than each getting their
    // own up to `max_attempts`.
    let mut attempt = 0u32;
    let mut calls_used = 0u32;
    loop {
        attempt += 1;
        let remaining_budget = max_attempts.saturating_sub(calls_used);

        // Denoising.
        let denoise_result = if req.autoregressive_fallback {
            run_with_autoregressive_fallback(
                backbone,
                &masked_buffer,
                &spans,
                &condition.text(),
                &schedule,
                config.guidance_scale,
                remaining_budget,
                &req.instruction,
                |candidate| validate_syntax(candidate, req.language).verdict.is_ok(),
            )
            .await
        } else {
            run_single_pass(
                backbone,
                &masked_buffer,
                &spans,
                &condition.text(),
                &schedule,
                config.guidance_scale,
            )
            .await
        };

        let outcome = match denoise_result {
            Ok(o) => o,
            Err(e) => {
                ledger.log_error(&format!("denoising failed: {e}"));
                ledger.finalize(Some(false));
                return RunOutcome {
                    terminal: Terminal::HardError,
                    patch: Patch::rejected(req.source.clone(), spans),
                    attempts: attempt,
                };
            }
        };

        calls_used += outcome.backbone_calls();

        ledger.log_model_usage(
            "denoising",
            backbone_name(&outcome.backbone_tag),
            "candidate generation",
            0,
            outcome.elapsed.as_millis() as u64,
        );

        // ValidatingSyntax / ValidatingSemantics, composed in one gate pass.
        let temp_path = std::env::temp_dir().join(format!(
            "{}-attempt-{attempt}.tmp",
            sanitize_run_id(ledger.run_id())
        ));
        let gate = run_gate(
            &outcome.candidate_source,
            req.language,
            &temp_path,
            config.checker_preference,
            config.timeouts.type_check_probe(),
            config.timeouts.type_check(),
        )
        .await;

        let (stage, passed) = log_gate(ledger, &gate.verdict, gate.checker_used);

        if gate.verdict.is_ok() {
            info!(attempt, "candidate accepted");
            let (added, removed) = line_changes(&req.source, &outcome.candidate_source);
            ledger.log_file_modification(&req.file_path, &req.source, &outcome.candidate_source, added, removed);
            let patch = Patch::accepted(
                &req.file_path,
                req.source.clone(),
                outcome.candidate_source,
                spans,
                &gate.verdict,
            );
            ledger.finalize(Some(true));
            return RunOutcome {
                terminal: Terminal::Accepted,
                patch,
                attempts: attempt,
            };
        }

        if !passed && calls_used < max_attempts {
            let summary = gate.verdict.summary().unwrap_or_else(|| "unknown error".to_string());
            condition.revise(stage, &summary);
            ledger.log_condition_revision(attempt, &summary);
            info!(attempt, stage, "rejected, retrying with revised condition");
            continue;
        }

        warn!(attempt, calls_used, "retries exhausted, rejecting");
        ledger.finalize(Some(false));
        return RunOutcome {
            terminal: Terminal::RejectedExhausted,
            patch: Patch::rejected(req.source.clone(), spans),
            attempts: attempt,
        };
    }
}

fn backbone_name(tag: &denoising_driver::BackboneTag) -> &'static str {
    match tag {
        denoising_driver::BackboneTag::Normal => "diffusion-backbone",
        denoising_driver::BackboneTag::Fallback => "diffusion-backbone-fallback",
    }
}

/// Logs the stage-1/stage-2 safety checks implied by one `GateOutcome`
/// and returns `(failed_stage, overall_pass)` for the caller's retry
/// decision. `failed_stage` is meaningless when `overall_pass` is true.
fn log_gate(ledger: &mut Ledger, verdict: &ValidationVerdict, checker_used: Option<&'static str>) -> (&'static str, bool) {
    match verdict {
        ValidationVerdict::Ok => {
            ledger.log_safety_check("syntactic", true, "stage 1 passed");
            ledger.log_safety_check("semantic", true, checker_used.unwrap_or("none"));
            ("semantic", true)
        }
        ValidationVerdict::ToolingUnavailable => {
            ledger.log_safety_check("syntactic", true, "stage 1 passed");
            ledger.log_safety_check("semantic", true, "tooling unavailable, conditionally accepted");
            ("semantic", true)
        }
        ValidationVerdict::SyntacticError { .. } => {
            let detail = verdict.summary().unwrap_or_default();
            ledger.log_safety_check("syntactic", false, &detail);
            ("syntax", false)
        }
        ValidationVerdict::SemanticError { .. } => {
            let detail = verdict.summary().unwrap_or_default();
            ledger.log_safety_check("syntactic", true, "stage 1 passed");
            ledger.log_safety_check("semantic", false, &detail);
            ("semantic", false)
        }
    }
}

fn sanitize_run_id(run_id: &str) -> String {
    run_id.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::RunConfig;
    use denoising_driver::MockBackbone;
    use serde_json::json;
    use syntax_engine::LanguageKind;

    /// S1 — single Python function rename, mock backbone.
    #[tokio::test]
    async fn s1_single_python_function_rename() {
        let req = RunRequest::new(
            "a.py",
            "def add(a,b):\n    return a+b\n",
            vec!["add".to_string()],
            "Rename parameters to x,y",
            LanguageKind::Python,
        );
        let config = RunConfig::mock();
        let mut ledger = Ledger::new(req.instruction.clone(), config.snapshot());
        let outcome = run_request(&req, &config, &mut ledger).await;

        assert_eq!(outcome.terminal, Terminal::Accepted);
        assert!(outcome.patch.applicable);
        assert!(outcome.patch.risk_score < 0.3);
        assert!(outcome.patch.unified_diff.contains("a.py"));
        assert_eq!(outcome.patch.mask_spans.len(), 1);
        assert_eq!(outcome.patch.mask_spans[0].category, "function_definition");
    }

    /// S2 — function not found.
    #[tokio::test]
    async fn s2_function_not_found_is_hard_error() {
        let req = RunRequest::new(
            "a.py",
            "def add(a,b):\n    return a+b\n",
            vec!["missing".to_string()],
            "rename missing",
            LanguageKind::Python,
        );
        let config = RunConfig::mock();
        let mut ledger = Ledger::new(req.instruction.clone(), config.snapshot());
        let outcome = run_request(&req, &config, &mut ledger).await;

        assert_eq!(outcome.terminal, Terminal::HardError);
        assert_eq!(outcome.patch.unified_diff, "");
        assert!(!outcome.patch.applicable);

        let record = ledger.finalize(None);
        assert!(!record.success);
        assert_eq!(record.errors.len(), 1);
    }

    /// S3 — syntax-reject then accept.
    #[tokio::test]
    async fn s3_syntax_reject_then_accept() {
        let req = RunRequest::new(
            "x.py",
            "def x():\n    pass\n",
            vec!["x".to_string()],
            "fix x",
            LanguageKind::Python,
        );
        let mut config = RunConfig::mock();
        config.max_retries = 2;
        let backbone = Backbone::Mock(MockBackbone::with_script(vec![
            "def x(: ".to_string(),
            "def x():\n    pass".to_string(),
        ]));
        let mut ledger = Ledger::new(req.instruction.clone(), config.snapshot());
        let outcome = run_request_with_backbone(&req, &config, &mut ledger, &backbone).await;

        assert_eq!(outcome.terminal, Terminal::Accepted);
        assert!(outcome.patch.applicable);
        assert_eq!(outcome.attempts, 2);

        let record = ledger.finalize(None);
        let failing = record.safety_checks.iter().filter(|c| !c.passed).count();
        let passing = record.safety_checks.iter().filter(|c| c.passed).count();
        assert!(failing >= 1);
        assert!(passing >= 1);
        assert_eq!(record.condition_revisions.len(), 1);
        assert_eq!(record.condition_revisions[0].attempt, 1);
    }

    /// S4 — all retries exhausted.
    #[tokio::test]
    async fn s4_all_retries_exhausted() {
        let req = RunRequest::new(
            "x.py",
            "def x():\n    pass\n",
            vec!["x".to_string()],
            "fix x",
            LanguageKind::Python,
        );
        let mut config = RunConfig::mock();
        config.max_retries = 2;
        let backbone = Backbone::Mock(MockBackbone::with_script(vec!["def x(: ".to_string()]));
        let mut ledger = Ledger::new(req.instruction.clone(), config.snapshot());
        let outcome = run_request_with_backbone(&req, &config, &mut ledger, &backbone).await;

        assert_eq!(outcome.terminal, Terminal::RejectedExhausted);
        assert!(!outcome.patch.applicable);
        assert_eq!(outcome.attempts, 3);

        let record = ledger.finalize(None);
        assert!(!record.success);
        let failing_syntactic = record
            .safety_checks
            .iter()
            .filter(|c| c.check_type == "syntactic" && !c.passed)
            .count();
        assert_eq!(failing_syntactic, 3);
    }

    /// S6 — TypeScript method masking.
    #[tokio::test]
    async fn s6_typescript_method_masking() {
        let source = "class Foo {\n  m(): void {}\n  other(): void {}\n}\n";
        let req = RunRequest::new(
            "foo.ts",
            source,
            vec!["m".to_string()],
            "implement m",
            LanguageKind::TypeScript,
        );
        let config = RunConfig::mock();
        let mut ledger = Ledger::new(req.instruction.clone(), config.snapshot());
        let outcome = run_request(&req, &config, &mut ledger).await;

        assert_eq!(outcome.patch.mask_spans.len(), 1);
        assert_eq!(outcome.patch.mask_spans[0].category, "method_definition");
        assert!(outcome.patch.mask_spans[0].original_text.contains("m()"));
        if outcome.terminal == Terminal::Accepted {
            assert!(outcome.patch.generated_source.contains("other(): void {}"));
        }
    }

    #[tokio::test]
    async fn missing_target_is_a_hard_error() {
        let req = RunRequest::new(
            "a.py",
            "def a():\n    pass\n",
            vec!["nonexistent".to_string()],
            "rename nonexistent to b",
            LanguageKind::Python,
        );
        let config = RunConfig::mock();
        let mut ledger = Ledger::new(req.instruction.clone(), json!({}));
        let outcome = run_request(&req, &config, &mut ledger).await;
        assert_eq!(outcome.terminal, Terminal::HardError);
        assert!(!outcome.patch.applicable);
    }

    /// Autoregressive fallback must not blow the shared attempt budget:
    /// every outer retry plus every inner fallback pass and completion
    /// call, summed, stays within `max_retries + 1` (§8.4).
    #[tokio::test]
    async fn autoregressive_fallback_never_exceeds_the_backbone_call_budget() {
        let req = RunRequest::new(
            "x.py",
            "def x():\n    pass\n",
            vec!["x".to_string()],
            "fix x",
            LanguageKind::Python,
        )
        .with_autoregressive_fallback(true);
        let mut config = RunConfig::mock();
        config.max_retries = 1; // max_attempts = 2
        let mock = MockBackbone::with_script(vec!["def x(: ".to_string()]); // always invalid
        let backbone = Backbone::Mock(mock);
        let mut ledger = Ledger::new(req.instruction.clone(), config.snapshot());
        let outcome = run_request_with_backbone(&req, &config, &mut ledger, &backbone).await;

        assert_eq!(outcome.terminal, Terminal::RejectedExhausted);
        let Backbone::Mock(mock) = &backbone else {
            unreachable!()
        };
        assert!(mock.calls_made() as u32 <= config.max_retries + 1);
    }

    #[tokio::test]
    async fn idempotent_mock_backbone_accepts_on_first_attempt() {
        let req = RunRequest::new(
            "a.py",
            "def a():\n    pass\n",
            vec!["a".to_string()],
            "flesh out the function",
            LanguageKind::Python,
        );
        let config = RunConfig::mock();
        let mut ledger = Ledger::new(req.instruction.clone(), config.snapshot());
        let outcome = run_request(&req, &config, &mut ledger).await;
        assert_eq!(outcome.terminal, Terminal::Accepted);
        assert!(outcome.patch.applicable);
        assert_eq!(outcome.attempts, 1);
    }
}

//! Batch operation (§4.5): priority-sorted sequential processing, with
//! results handed back in the caller's original order regardless of
//! processing order.

use core_config::RunConfig;
use provenance_ledger::Ledger;

use crate::orchestrator::{RunOutcome, run_request};
use crate::request::RunRequest;

/// Runs every request in `requests` sequentially, highest `priority`
/// first (stable sort so equal-priority requests keep their relative
/// input order), then returns outcomes re-indexed back to the
/// caller's original order. A per-request failure never aborts the
/// batch — it only produces that slot's own `HardError`/`Rejected*`
/// outcome, exactly as `run_request` would for a single call.
pub async fn run_batch(requests: &[RunRequest], config: &RunConfig) -> Vec<RunOutcome> {
    let mut order: Vec<usize> = (0..requests.len()).collect();
    order.sort_by(|&a, &b| requests[b].priority.cmp(&requests[a].priority));

    let mut slots: Vec<Option<RunOutcome>> = (0..requests.len()).map(|_| None).collect();
    for idx in order {
        let req = &requests[idx];
        let mut ledger = Ledger::new(req.instruction.clone(), config.snapshot());
        let outcome = run_request(req, config, &mut ledger).await;
        slots[idx] = Some(outcome);
    }

    slots.into_iter().map(|o| o.expect("every slot visited exactly once")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use syntax_engine::LanguageKind;

    fn req(name: &str, priority: i64) -> RunRequest {
        RunRequest::new(
            format!("{name}.py"),
            format!("def {name}():\n    pass\n"),
            vec![name.to_string()],
            "flesh it out",
            LanguageKind::Python,
        )
        .with_priority(priority)
    }

    #[tokio::test]
    async fn batch_returns_results_in_input_order() {
        let requests = vec![req("low", 1), req("high", 10), req("mid", 5)];
        let config = RunConfig::mock();
        let outcomes = run_batch(&requests, &config).await;
        assert_eq!(outcomes.len(), 3);
        // input order preserved regardless of priority-driven processing order
        assert_eq!(outcomes[0].patch.original_source, "def low():\n    pass\n");
        assert_eq!(outcomes[1].patch.original_source, "def high():\n    pass\n");
        assert_eq!(outcomes[2].patch.original_source, "def mid():\n    pass\n");
    }

    #[tokio::test]
    async fn a_single_hard_error_does_not_abort_the_batch() {
        let mut bad = req("missing", 0);
        bad.target_names = vec!["does_not_exist".to_string()];
        let requests = vec![req("ok", 0), bad];
        let config = RunConfig::mock();
        let outcomes = run_batch(&requests, &config).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].patch.applicable);
        assert!(!outcomes[1].patch.applicable);
    }
}

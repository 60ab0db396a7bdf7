//! Per-request denoising orchestration: runs one pass over every mask
//! span, substitutes predictions back into the masked buffer, and
//! optionally drives the bounded autoregressive fallback.

use std::time::Duration;

use mask_builder::MaskSpan;
use tracing::{info, warn};

use crate::backbone::{Backbone, DenoiseContext};
use crate::error::Result;
use crate::schedule::NoiseSchedule;

pub const MASK_TOKEN: &str = mask_builder::MASK_TOKEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackboneTag {
    Normal,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct DenoiseOutcome {
    pub candidate_source: String,
    pub backbone_tag: BackboneTag,
    pub num_steps: usize,
    pub guidance_scale: f64,
    pub elapsed: Duration,
    pub passes_attempted: u32,
}

impl DenoiseOutcome {
    /// Total number of backbone invocations (`predict` + an optional
    /// `fallback_complete`) this outcome represents. Callers that
    /// budget backbone calls across retries (§8.4's attempt bound)
    /// must consume this, not just `passes_attempted`.
    pub fn backbone_calls(&self) -> u32 {
        self.passes_attempted
            + match self.backbone_tag {
                BackboneTag::Normal => 0,
                BackboneTag::Fallback => 1,
            }
    }
}

/// Runs exactly one denoising pass and substitutes every span's
/// prediction back into `masked_buffer`, descending by start byte so
/// earlier offsets stay valid (§4.3 step 5).
pub async fn run_single_pass(
    backbone: &Backbone,
    masked_buffer: &str,
    spans: &[MaskSpan],
    condition: &str,
    schedule: &NoiseSchedule,
    guidance_scale: f64,
) -> Result<DenoiseOutcome> {
    let ctx = DenoiseContext {
        masked_buffer,
        spans,
        condition,
        schedule,
        guidance_scale,
    };
    let result = backbone.predict(&ctx).await?;
    let candidate_source = synthesize_candidate(masked_buffer, spans, &result.predictions);

    info!(
        num_spans = spans.len(),
        num_steps = schedule.num_steps(),
        guidance_scale,
        elapsed_ms = result.elapsed.as_millis(),
        "denoising pass complete"
    );

    Ok(DenoiseOutcome {
        candidate_source,
        backbone_tag: BackboneTag::Normal,
        num_steps: schedule.num_steps(),
        guidance_scale,
        elapsed: result.elapsed,
        passes_attempted: 1,
    })
}

/// Substitutes Mask Tokens with per-span predictions in
/// descending-start order (§4.3 step 5 / §3's Candidate Source
/// definition). `predictions` must be in the same order as `spans`
/// (ascending start byte).
pub fn synthesize_candidate(masked_buffer: &str, spans: &[MaskSpan], predictions: &[String]) -> String {
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by(|&a, &b| spans[b].start_byte.cmp(&spans[a].start_byte));

    let mut buffer = masked_buffer.to_string();
    for idx in order {
        // Mask Tokens are fixed-width and appear in the same ascending
        // order as `spans`; replacing the rightmost remaining
        // occurrence first (descending span order) keeps earlier
        // offsets valid exactly as the Mask Builder's own algorithm
        // does in reverse.
        if let Some(pos) = buffer.rfind(MASK_TOKEN) {
            buffer.replace_range(pos..pos + MASK_TOKEN.len(), &predictions[idx]);
        }
    }
    buffer
}

/// Drives denoising passes followed by an optional single-shot
/// fallback completion, the two together never issuing more than
/// `max_backbone_calls` total backbone invocations (predict calls plus
/// the fallback call, if any) — callers that also retry at an outer
/// layer must size this from their own remaining attempt budget, not a
/// fixed pass count, or the shared bound in §8.4 ("C5 invokes the
/// backbone at most `max_retries + 1` times per request") can be blown
/// past a combinatorial number of times.
///
/// Each pass is checked by the caller-supplied `validate` closure
/// (backed by the Safety Gate one layer up). If every pass within
/// budget is rejected and at least one call remains, issues a
/// single-shot fallback completion tagged `backbone = fallback`,
/// keeping the fallback a distinct code path rather than a duplicated
/// state machine (§9). With a budget of exactly one call, no fallback
/// call is made — the single pass is returned as-is.
pub async fn run_with_autoregressive_fallback(
    backbone: &Backbone,
    masked_buffer: &str,
    spans: &[MaskSpan],
    condition: &str,
    schedule: &NoiseSchedule,
    guidance_scale: f64,
    max_backbone_calls: u32,
    instruction: &str,
    mut validate: impl FnMut(&str) -> bool,
) -> Result<DenoiseOutcome> {
    let max_backbone_calls = max_backbone_calls.max(1);
    // Reserve one call for the fallback completion whenever the budget
    // allows more than a single pass.
    let passes_allowed = if max_backbone_calls > 1 {
        max_backbone_calls - 1
    } else {
        1
    };

    let mut attempts = 0u32;
    let mut last_outcome = None;
    for _ in 0..passes_allowed {
        attempts += 1;
        let outcome =
            run_single_pass(backbone, masked_buffer, spans, condition, schedule, guidance_scale).await?;
        if validate(&outcome.candidate_source) {
            return Ok(DenoiseOutcome {
                passes_attempted: attempts,
                ..outcome
            });
        }
        last_outcome = Some(outcome);
    }

    if max_backbone_calls <= 1 {
        warn!(attempts, "budget exhausted by a single pass, no room left for fallback");
        return Ok(DenoiseOutcome {
            passes_attempted: attempts,
            ..last_outcome.expect("passes_allowed is always at least 1")
        });
    }

    warn!(attempts, "autoregressive fallback triggered after exhausting denoising passes");

    let fallback_prompt = build_fallback_prompt(instruction, masked_buffer);
    let started = std::time::Instant::now();
    let text = backbone.fallback_complete(&fallback_prompt).await?;
    let candidate_source = substitute_all_masks(masked_buffer, spans, &text);

    Ok(DenoiseOutcome {
        candidate_source,
        backbone_tag: BackboneTag::Fallback,
        num_steps: 0,
        guidance_scale,
        elapsed: started.elapsed(),
        passes_attempted: attempts,
    })
}

fn build_fallback_prompt(instruction: &str, masked_buffer: &str) -> String {
    let placeholdered = masked_buffer.replace(MASK_TOKEN, "???");
    format!(
        "Complete the following code. Instruction: {instruction}\n\n{placeholdered}"
    )
}

/// The fallback's single completion replaces every Mask Token
/// identically (§4.3: "The fallback's outputs are substituted
/// identically").
fn substitute_all_masks(masked_buffer: &str, spans: &[MaskSpan], text: &str) -> String {
    let mut buffer = masked_buffer.to_string();
    for _ in spans {
        if let Some(pos) = buffer.find(MASK_TOKEN) {
            buffer.replace_range(pos..pos + MASK_TOKEN.len(), text);
        }
    }
    buffer
}

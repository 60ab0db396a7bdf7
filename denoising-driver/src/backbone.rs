//! The diffusion backbone capability, mirrored on
//! `LlmServiceProfiles`'s one-struct-per-provider-set, enum-dispatch
//! pattern: no trait objects, selection is a tagged configuration.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{DenoiseError, Result};
use crate::schedule::NoiseSchedule;
use mask_builder::MaskSpan;

/// One conceptual backbone call: masked buffer, the full and empty
/// conditions for CFG mixing, and the fixed guidance scale. The
/// adapter owns the mix; this driver only forwards the knob.
pub struct DenoiseContext<'a> {
    pub masked_buffer: &'a str,
    pub spans: &'a [MaskSpan],
    pub condition: &'a str,
    pub schedule: &'a NoiseSchedule,
    pub guidance_scale: f64,
}

#[derive(Debug, Serialize)]
struct HttpDenoiseRequest<'a> {
    masked_buffer: &'a str,
    condition: &'a str,
    empty_condition: &'a str,
    guidance_scale: f64,
    span_original_text: &'a str,
    span_category: &'a str,
    num_steps: usize,
}

#[derive(Debug, Deserialize)]
struct HttpDenoiseResponse {
    text: String,
}

#[derive(Debug, Serialize)]
struct HttpFallbackRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct HttpFallbackResponse {
    text: String,
}

/// Deterministic backbone for tests and the demo binary. Holds an
/// optional scripted sequence of per-attempt outputs (for scenarios
/// like S3/S4 where the mock must fail then succeed); falls back to a
/// single fixed prediction otherwise, which keeps the "idempotent mock
/// generation" invariant trivially true.
pub struct MockBackbone {
    script: Mutex<Vec<String>>,
    cursor: Mutex<usize>,
    default_prediction: String,
}

impl MockBackbone {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            cursor: Mutex::new(0),
            default_prediction: "def mock_function():\n    pass".to_string(),
        }
    }

    /// Configures a fixed sequence of attempt-level outputs. Attempt
    /// `k` (0-indexed) uses `script[k.min(script.len()-1)]`; once the
    /// script is exhausted the last entry repeats.
    pub fn with_script(responses: Vec<String>) -> Self {
        Self {
            script: Mutex::new(responses),
            cursor: Mutex::new(0),
            default_prediction: "def mock_function():\n    pass".to_string(),
        }
    }

    fn next_prediction(&self) -> String {
        let script = self.script.lock().unwrap();
        if script.is_empty() {
            return self.default_prediction.clone();
        }
        let mut cursor = self.cursor.lock().unwrap();
        let idx = (*cursor).min(script.len() - 1);
        *cursor += 1;
        script[idx].clone()
    }

    /// Number of predictions handed out so far, for tests that assert
    /// a bound on total backbone invocations.
    pub fn calls_made(&self) -> usize {
        *self.cursor.lock().unwrap()
    }
}

impl Default for MockBackbone {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP-JSON backbone speaking the diffusion contract (§6): opaque
/// generation endpoint, prompt + max_tokens + temperature in, a
/// generated string out. The fallback path reuses the same endpoint
/// with a distinct prompt template.
pub struct HttpBackbone {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpBackbone {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            timeout,
        }
    }

    async fn request(&self, masked_buffer: &str, span: &MaskSpan, ctx: &DenoiseContext<'_>) -> Result<String> {
        let mut req = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&HttpDenoiseRequest {
                masked_buffer,
                condition: ctx.condition,
                empty_condition: "",
                guidance_scale: ctx.guidance_scale,
                span_original_text: &span.original_text,
                span_category: &span.category,
                num_steps: ctx.schedule.num_steps(),
            });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                DenoiseError::Timeout
            } else {
                DenoiseError::Backbone(e.to_string())
            }
        })?;
        let resp = resp
            .error_for_status()
            .map_err(|e| DenoiseError::Backbone(e.to_string()))?;
        let body: HttpDenoiseResponse = resp
            .json()
            .await
            .map_err(|e| DenoiseError::InvalidResponse(e.to_string()))?;
        Ok(body.text)
    }

    async fn fallback(&self, prompt: &str) -> Result<String> {
        let mut req = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&HttpFallbackRequest {
                prompt,
                max_tokens: 2048,
                temperature: 0.2,
            });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| DenoiseError::Backbone(e.to_string()))?;
        let resp = resp
            .error_for_status()
            .map_err(|e| DenoiseError::Backbone(e.to_string()))?;
        let body: HttpFallbackResponse = resp
            .json()
            .await
            .map_err(|e| DenoiseError::InvalidResponse(e.to_string()))?;
        Ok(body.text)
    }
}

/// The polymorphic backbone capability. One request is "conceptually
/// two conditional queries ... mixed by a fixed guidance scale"; the
/// external protocol reduces this to a single request, so the mix
/// itself is the adapter's contract, never modeled here.
pub enum Backbone {
    Mock(MockBackbone),
    Http(HttpBackbone),
}

pub struct PredictionResult {
    pub predictions: Vec<String>,
    pub elapsed: Duration,
}

impl Backbone {
    /// Runs one full denoising pass over every span and returns one
    /// prediction per span, in span order. The N-step schedule is the
    /// backbone's own responsibility: Mock resolves it trivially
    /// (deterministic output regardless of step count); Http would
    /// iterate internally in a fuller implementation, but since the
    /// protocol's single-request contract already embeds `num_steps`,
    /// one request per span suffices here.
    pub async fn predict(&self, ctx: &DenoiseContext<'_>) -> Result<PredictionResult> {
        let started = Instant::now();
        let mut predictions = Vec::with_capacity(ctx.spans.len());

        match self {
            Backbone::Mock(mock) => {
                for _ in ctx.spans {
                    predictions.push(mock.next_prediction());
                }
            }
            Backbone::Http(http) => {
                for span in ctx.spans {
                    let text = http.request(ctx.masked_buffer, span, ctx).await?;
                    predictions.push(text);
                }
            }
        }

        Ok(PredictionResult {
            predictions,
            elapsed: started.elapsed(),
        })
    }

    /// Single-shot autoregressive fallback completion, used when every
    /// denoising pass was rejected. Tagged distinctly by the caller
    /// (`backbone = fallback`), never folded into the normal state
    /// machine.
    pub async fn fallback_complete(&self, prompt: &str) -> Result<String> {
        match self {
            Backbone::Mock(mock) => Ok(mock.next_prediction()),
            Backbone::Http(http) => http.fallback(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::NoiseSchedule;
    use core_config::NoiseScheduleKind;

    fn span(name: &str) -> MaskSpan {
        MaskSpan {
            start_byte: 0,
            end_byte: 10,
            start_line: 0,
            end_line: 0,
            start_column: 0,
            end_column: 10,
            original_text: "def x(): pass".to_string(),
            category: "function_definition".to_string(),
            parent_category: None,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn mock_backbone_is_idempotent_by_default() {
        let backbone = Backbone::Mock(MockBackbone::new());
        let schedule = NoiseSchedule::new(4, NoiseScheduleKind::Cosine);
        let spans = vec![span("foo")];
        let ctx = DenoiseContext {
            masked_buffer: "[MASK]",
            spans: &spans,
            condition: "do the thing",
            schedule: &schedule,
            guidance_scale: 1.5,
        };
        let first = backbone.predict(&ctx).await.unwrap();
        let second = backbone.predict(&ctx).await.unwrap();
        assert_eq!(first.predictions, second.predictions);
    }

    #[tokio::test]
    async fn scripted_mock_advances_per_attempt() {
        let backbone = Backbone::Mock(MockBackbone::with_script(vec![
            "def x(: ".to_string(),
            "def x():\n    pass".to_string(),
        ]));
        let schedule = NoiseSchedule::new(4, NoiseScheduleKind::Cosine);
        let spans = vec![span("x")];
        let ctx = DenoiseContext {
            masked_buffer: "[MASK]",
            spans: &spans,
            condition: "fix it",
            schedule: &schedule,
            guidance_scale: 1.5,
        };
        let first = backbone.predict(&ctx).await.unwrap();
        let second = backbone.predict(&ctx).await.unwrap();
        assert_eq!(first.predictions[0], "def x(: ");
        assert_eq!(second.predictions[0], "def x():\n    pass");
    }
}

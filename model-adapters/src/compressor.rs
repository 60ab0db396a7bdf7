//! Compressor capability: long-context summarizer.
//!
//! Input = instruction + target paths + bulk source; output = a dense
//! technical summary plus token counts. The core verifies the summary
//! references every target path by name (§6); that check is
//! non-blocking per the resolved Open Question on the hallucination
//! heuristic (§9) and surfaces only as a warning.

use core_config::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::error::Result;
use crate::retry::retry_with_backoff;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedContext {
    pub summary: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

pub struct CompressorClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    backoff: BackoffPolicy,
}

#[derive(Serialize)]
struct CompressorRequest<'a> {
    instruction: &'a str,
    target_paths: &'a [String],
    source: &'a str,
}

impl CompressorClient {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration, backoff: BackoffPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            timeout,
            backoff,
        }
    }

    pub async fn compress(
        &self,
        instruction: &str,
        target_paths: &[String],
        source: &str,
    ) -> Result<CompressedContext> {
        let ctx = retry_with_backoff(&self.backoff, || async {
            let mut req = self
                .http
                .post(&self.endpoint)
                .timeout(self.timeout)
                .json(&CompressorRequest {
                    instruction,
                    target_paths,
                    source,
                });
            if let Some(key) = &self.api_key {
                req = req.bearer_auth(key);
            }
            let resp = req.send().await?.error_for_status()?;
            let ctx: CompressedContext = resp.json().await?;
            Ok(ctx)
        })
        .await?;

        for path in target_paths {
            if !bag_of_words_covers(&ctx.summary, path) {
                warn!(path, "compressor summary does not mention target path by name");
            }
        }

        Ok(ctx)
    }
}

/// Brittle bag-of-words coverage check: does `summary` contain the
/// path's filename as a substring? Optional and non-blocking (§9).
fn bag_of_words_covers(summary: &str, path: &str) -> bool {
    let filename = path.rsplit('/').next().unwrap_or(path);
    summary.contains(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_check_matches_filename_substring() {
        assert!(bag_of_words_covers("touches utils.py in several places", "src/utils.py"));
        assert!(!bag_of_words_covers("touches nothing relevant", "src/utils.py"));
    }
}

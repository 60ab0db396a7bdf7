//! Exponential-backoff retry wrapper for transient adapter failures.
//!
//! Distinct from the Build Orchestrator's semantic-retry budget: this
//! retries at the transport layer only, and never retries an
//! authentication failure.

use std::time::Duration;

use core_config::BackoffPolicy;
use tracing::warn;

use crate::error::{AdapterError, ProviderError};

/// Runs `op` up to `policy.max_attempts` times, doubling the delay
/// (factor from `policy.factor`) between attempts, starting from
/// `policy.base_delay_ms`. Stops immediately on a non-retryable
/// provider error.
pub async fn retry_with_backoff<F, Fut, T>(policy: &BackoffPolicy, mut op: F) -> Result<T, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AdapterError>>,
{
    let mut attempt = 0u32;
    let mut delay_ms = policy.base_delay_ms;

    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e @ AdapterError::Provider(ref p)) if !p.is_retryable() => {
                return Err(e);
            }
            Err(e) => {
                if attempt >= policy.max_attempts {
                    return Err(e);
                }
                warn!(attempt, delay_ms, error = %e, "adapter call failed, retrying");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = delay_ms.saturating_mul(policy.factor as u64);
            }
        }
    }
}

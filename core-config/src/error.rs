//! Configuration errors for the refactoring core.
//!
//! Mirrors the `ai-llm-service` error-handler shape: a single focused
//! enum covering only what realistically happens at config load time,
//! plus small env-reading helpers that return it.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    #[error("invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },

    #[error("unsupported value {value:?} for {var}")]
    UnsupportedValue { var: &'static str, value: String },
}

/// Fetches an optional environment variable, `None` if unset/empty.
pub fn env_opt(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
pub fn env_opt_u32(name: &'static str) -> Result<Option<u32>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.parse::<u32>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidNumber {
                    var: name,
                    reason: "expected u32",
                })
        }
        _ => Ok(None),
    }
}

/// Parses an optional `f64` from env (`Ok(None)` if unset/empty).
pub fn env_opt_f64(name: &'static str) -> Result<Option<f64>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.parse::<f64>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidNumber {
                    var: name,
                    reason: "expected f64",
                })
        }
        _ => Ok(None),
    }
}

/// Parses an optional `u64` duration in seconds (`Ok(None)` if unset/empty).
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.parse::<u64>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidNumber {
                    var: name,
                    reason: "expected u64",
                })
        }
        _ => Ok(None),
    }
}

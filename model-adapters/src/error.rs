//! Error taxonomy for external adapters.
//!
//! Mirrors `mr-reviewer::errors`'s `Error`/`ProviderError` split: a root
//! enum for callers, a provider-specific enum carrying HTTP-status
//! mapping, converted via `#[from]`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdapterError>;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("knowledge graph unavailable, degrading to direct-file context")]
    GraphDegraded,

    #[error("compressor output missing coverage of target path: {0}")]
    MissingPathCoverage(String),

    #[error("other adapter error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("server error: status {0}")]
    Server(u16),

    #[error("http status error: {0}")]
    HttpStatus(u16),

    #[error("timeout")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Authentication failures are never worth retrying.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::Unauthorized | ProviderError::Forbidden)
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        AdapterError::Provider(ProviderError::from(e))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ProviderError::Timeout;
        }
        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => ProviderError::Unauthorized,
                403 => ProviderError::Forbidden,
                404 => ProviderError::NotFound,
                429 => ProviderError::RateLimited {
                    retry_after_secs: None,
                },
                500..=599 => ProviderError::Server(code),
                _ => ProviderError::HttpStatus(code),
            };
        }
        ProviderError::Network(e.to_string())
    }
}

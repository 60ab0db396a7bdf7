//! Error taxonomy for the denoising driver.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DenoiseError>;

#[derive(Debug, Error)]
pub enum DenoiseError {
    #[error("backbone request failed: {0}")]
    Backbone(String),

    #[error("backbone request timed out")]
    Timeout,

    #[error("backbone returned an unusable response: {0}")]
    InvalidResponse(String),
}

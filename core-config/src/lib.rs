//! Ambient configuration layer shared by every core crate.
//!
//! Mirrors `ai-llm-service::config` + `ai-llm-service::error_handler`:
//! a typed config struct loaded from environment variables through a
//! small set of fallible helpers, plus the error type those helpers
//! return.

pub mod config;
pub mod error;

pub use config::{
    ApiKeys, BackoffPolicy, CheckerPreference, DiffusionPreset, NoiseScheduleKind,
    PlannerProvider, RunConfig, Timeouts,
};
pub use error::{ConfigError, Result};

//! Denoising Driver (Component 3).
//!
//! Given a masked buffer, mask spans, and a condition string, drives
//! the iterative refinement against a backbone (mock or HTTP), with a
//! classifier-free-guidance knob and a bounded autoregressive fallback.

pub mod backbone;
pub mod driver;
pub mod error;
pub mod schedule;

pub use backbone::{Backbone, DenoiseContext, HttpBackbone, MockBackbone, PredictionResult};
pub use driver::{
    BackboneTag, DenoiseOutcome, run_single_pass, run_with_autoregressive_fallback, synthesize_candidate,
};
pub use error::{DenoiseError, Result};
pub use schedule::NoiseSchedule;

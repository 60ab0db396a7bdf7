//! Build Orchestrator (Component 5): composes the syntax engine, mask
//! builder, denoising driver and safety gate into the full
//! per-request state machine, plus priority-ordered batch scheduling.

pub mod backbone;
pub mod batch;
pub mod orchestrator;
pub mod patch;
pub mod request;

pub use batch::run_batch;
pub use orchestrator::{RunOutcome, Terminal, run_request, run_request_with_backbone};
pub use patch::{Patch, risk_score, unified_diff};
pub use request::{Condition, RunRequest};

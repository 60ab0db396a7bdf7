//! Thin capability shims for the knowledge graph and the remote
//! planner/compressor endpoints (cross-cutting "External adapters"
//! component, §2). The diffusion backbone adapter lives in
//! `denoising-driver`, which owns the CFG-mixing contract directly.

pub mod compressor;
pub mod error;
pub mod graph;
pub mod planner;
pub mod retry;

pub use compressor::{CompressedContext, CompressorClient};
pub use error::{AdapterError, ProviderError, Result};
pub use graph::{GraphNode, KnowledgeGraph, NullGraph, Relation};
pub use planner::{PlanChange, PlanChangeType, PlanOperation, PlannerClient, RefactorPlan};
pub use retry::retry_with_backoff;

//! Append-only provenance log for a refactoring run: every model call,
//! safety check and file modification is recorded and can be replayed
//! from the finalized JSON artifact.

pub mod error;
pub mod events;
pub mod hash;
pub mod ledger;

pub use error::{LedgerError, Result};
pub use events::{ProvenanceEvent, ProvenanceEventKind};
pub use ledger::{
    ArtifactMetadata, ConditionRevisionRecord, FileModificationRecord, Ledger, ModelUsageRecord,
    SafetyCheckRecord,
};

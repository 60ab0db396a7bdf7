//! Provenance Event model.
//!
//! Events carry monotonically increasing indices within a run (§3);
//! the ledger assigns the index, callers never set it themselves.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProvenanceEventKind {
    ModelUse {
        phase: String,
        model_name: String,
        purpose: String,
        tokens: u32,
        elapsed_ms: u64,
    },
    SafetyCheck {
        kind: String,
        passed: bool,
        detail: String,
        timestamp: String,
    },
    FileModification {
        path: String,
        hash_before: String,
        hash_after: String,
        lines_added: u32,
        lines_removed: u32,
    },
    ConditionRevision {
        attempt: u32,
        diagnostic: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceEvent {
    pub index: u64,
    #[serde(flatten)]
    pub kind: ProvenanceEventKind,
}

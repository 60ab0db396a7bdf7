//! The append-only, in-memory event log and its atomic finalization to
//! disk, ported from `ProvenanceLogger`/`ProvenanceMetadata`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::events::{ProvenanceEvent, ProvenanceEventKind};
use crate::hash::hash_content;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelUsageRecord {
    pub phase: String,
    pub model_name: String,
    pub purpose: String,
    pub tokens_used: u32,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyCheckRecord {
    pub check_type: String,
    pub passed: bool,
    pub details: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileModificationRecord {
    pub file_path: String,
    pub original_hash: String,
    pub modified_hash: String,
    pub lines_added: u32,
    pub lines_removed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionRevisionRecord {
    pub attempt: u32,
    pub diagnostic: String,
}

/// The persisted Ledger format (§6): the events projected into
/// categorized arrays, plus the `config` snapshot and aggregate
/// `metadata` counters computed at `finalize()` time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub run_id: String,
    pub issue_description: String,
    pub timestamp_start: String,
    pub timestamp_end: String,
    pub duration_seconds: f64,
    pub models_used: Vec<ModelUsageRecord>,
    pub safety_checks: Vec<SafetyCheckRecord>,
    pub file_modifications: Vec<FileModificationRecord>,
    pub condition_revisions: Vec<ConditionRevisionRecord>,
    pub config: Value,
    pub success: bool,
    pub errors: Vec<String>,
    pub metadata: Value,
}

/// The append-only, in-memory run log. One `Ledger` per run (or per
/// batch, sharing a single ledger across requests).
pub struct Ledger {
    run_id: String,
    issue_description: String,
    start: chrono::DateTime<chrono::Utc>,
    config_snapshot: Value,
    events: Vec<ProvenanceEvent>,
    success: bool,
}

impl Ledger {
    pub fn new(issue_description: impl Into<String>, config_snapshot: Value) -> Self {
        let run_id = generate_run_id();
        info!(run_id, "provenance ledger opened");
        Self {
            run_id,
            issue_description: issue_description.into(),
            start: chrono::Utc::now(),
            config_snapshot,
            events: Vec::new(),
            success: true,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn push(&mut self, kind: ProvenanceEventKind) -> u64 {
        let index = self.events.len() as u64;
        self.events.push(ProvenanceEvent { index, kind });
        index
    }

    pub fn log_model_usage(&mut self, phase: &str, model_name: &str, purpose: &str, tokens: u32, elapsed_ms: u64) -> u64 {
        self.push(ProvenanceEventKind::ModelUse {
            phase: phase.to_string(),
            model_name: model_name.to_string(),
            purpose: purpose.to_string(),
            tokens,
            elapsed_ms,
        })
    }

    pub fn log_safety_check(&mut self, kind: &str, passed: bool, detail: &str) -> u64 {
        self.push(ProvenanceEventKind::SafetyCheck {
            kind: kind.to_string(),
            passed,
            detail: detail.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn log_file_modification(&mut self, path: &str, original: &str, modified: &str, lines_added: u32, lines_removed: u32) -> u64 {
        self.push(ProvenanceEventKind::FileModification {
            path: path.to_string(),
            hash_before: hash_content(original),
            hash_after: hash_content(modified),
            lines_added,
            lines_removed,
        })
    }

    pub fn log_condition_revision(&mut self, attempt: u32, diagnostic: &str) -> u64 {
        self.push(ProvenanceEventKind::ConditionRevision {
            attempt,
            diagnostic: diagnostic.to_string(),
        })
    }

    pub fn log_error(&mut self, message: &str) -> u64 {
        self.success = false;
        self.push(ProvenanceEventKind::Error {
            message: message.to_string(),
        })
    }

    pub fn events(&self) -> &[ProvenanceEvent] {
        &self.events
    }

    /// Computes the final `ArtifactMetadata`, including the aggregate
    /// counters (`total_tokens_used`, `num_models_used`, ...) exactly
    /// as `ProvenanceLogger.finalize` does. Does not write to disk;
    /// see [`Self::save`].
    pub fn finalize(&mut self, success_override: Option<bool>) -> ArtifactMetadata {
        if let Some(s) = success_override {
            self.success = s;
        }
        let end = chrono::Utc::now();
        let duration_seconds = (end - self.start).num_milliseconds() as f64 / 1000.0;

        let mut models_used = Vec::new();
        let mut safety_checks = Vec::new();
        let mut file_modifications = Vec::new();
        let mut condition_revisions = Vec::new();
        let mut errors = Vec::new();

        for event in &self.events {
            match &event.kind {
                ProvenanceEventKind::ModelUse {
                    phase,
                    model_name,
                    purpose,
                    tokens,
                    elapsed_ms,
                } => models_used.push(ModelUsageRecord {
                    phase: phase.clone(),
                    model_name: model_name.clone(),
                    purpose: purpose.clone(),
                    tokens_used: *tokens,
                    duration_ms: *elapsed_ms,
                }),
                ProvenanceEventKind::SafetyCheck {
                    kind,
                    passed,
                    detail,
                    timestamp,
                } => safety_checks.push(SafetyCheckRecord {
                    check_type: kind.clone(),
                    passed: *passed,
                    details: detail.clone(),
                    timestamp: timestamp.clone(),
                }),
                ProvenanceEventKind::FileModification {
                    path,
                    hash_before,
                    hash_after,
                    lines_added,
                    lines_removed,
                } => file_modifications.push(FileModificationRecord {
                    file_path: path.clone(),
                    original_hash: hash_before.clone(),
                    modified_hash: hash_after.clone(),
                    lines_added: *lines_added,
                    lines_removed: *lines_removed,
                }),
                ProvenanceEventKind::ConditionRevision { attempt, diagnostic } => {
                    condition_revisions.push(ConditionRevisionRecord {
                        attempt: *attempt,
                        diagnostic: diagnostic.clone(),
                    })
                }
                ProvenanceEventKind::Error { message } => errors.push(message.clone()),
            }
        }

        let total_tokens_used: u64 = models_used.iter().map(|m| m.tokens_used as u64).sum();
        let total_model_time_ms: u64 = models_used.iter().map(|m| m.duration_ms).sum();
        let num_safety_checks_passed = safety_checks.iter().filter(|c| c.passed).count();
        let total_lines_added: u64 = file_modifications.iter().map(|m| m.lines_added as u64).sum();
        let total_lines_removed: u64 = file_modifications.iter().map(|m| m.lines_removed as u64).sum();

        let metadata = json!({
            "total_tokens_used": total_tokens_used,
            "total_model_time_ms": total_model_time_ms,
            "num_models_used": models_used.len(),
            "num_safety_checks": safety_checks.len(),
            "num_safety_checks_passed": num_safety_checks_passed,
            "num_files_modified": file_modifications.len(),
            "total_lines_added": total_lines_added,
            "total_lines_removed": total_lines_removed,
        });

        ArtifactMetadata {
            run_id: self.run_id.clone(),
            issue_description: self.issue_description.clone(),
            timestamp_start: self.start.to_rfc3339(),
            timestamp_end: end.to_rfc3339(),
            duration_seconds,
            models_used,
            safety_checks,
            file_modifications,
            condition_revisions,
            config: self.config_snapshot.clone(),
            success: self.success,
            errors,
            metadata,
        }
    }

    /// Atomically writes `record` to `path`: write `<path>.tmp`, fsync,
    /// rename. A crash between the two steps leaves only the `.tmp`
    /// behind; `path` itself is never partially written.
    pub async fn save(record: &ArtifactMetadata, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(record)?;

        let file = tokio::fs::File::create(&tmp_path).await?;
        {
            use tokio::io::AsyncWriteExt;
            let mut file = file;
            file.write_all(&body).await?;
            file.sync_all().await?;
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
            warn!(error = %e, "ledger rename failed, .tmp left on disk");
            return Err(e.into());
        }

        info!(path = %path.display(), "ledger written");
        Ok(())
    }
}

fn generate_run_id() -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("gen_{timestamp}_{}", &suffix[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_indices_are_monotonic() {
        let mut ledger = Ledger::new("test run", json!({}));
        let i0 = ledger.log_model_usage("reasoner", "mock", "planning", 100, 10);
        let i1 = ledger.log_safety_check("syntax", true, "ok");
        let i2 = ledger.log_error("boom");
        assert_eq!((i0, i1, i2), (0, 1, 2));
    }

    #[test]
    fn finalize_computes_aggregate_counters() {
        let mut ledger = Ledger::new("test run", json!({}));
        ledger.log_model_usage("reasoner", "mock", "planning", 100, 10);
        ledger.log_model_usage("generator", "mock", "denoising", 50, 20);
        ledger.log_safety_check("syntax", true, "ok");
        ledger.log_safety_check("semantic", false, "type error");
        ledger.log_file_modification("a.py", "old", "new and longer", 2, 1);

        let record = ledger.finalize(Some(true));
        assert_eq!(record.metadata["total_tokens_used"], 150);
        assert_eq!(record.metadata["num_models_used"], 2);
        assert_eq!(record.metadata["num_safety_checks"], 2);
        assert_eq!(record.metadata["num_safety_checks_passed"], 1);
        assert_eq!(record.metadata["num_files_modified"], 1);
        assert_eq!(record.metadata["total_lines_added"], 2);
    }

    #[test]
    fn logging_an_error_marks_the_run_unsuccessful() {
        let mut ledger = Ledger::new("test run", json!({}));
        ledger.log_error("bad input");
        let record = ledger.finalize(None);
        assert!(!record.success);
        assert_eq!(record.errors, vec!["bad input".to_string()]);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let mut ledger = Ledger::new("round trip", json!({"k": "v"}));
        ledger.log_model_usage("reasoner", "mock", "planning", 10, 5);
        let record = ledger.finalize(Some(true));

        let dir = std::env::temp_dir().join(format!("ledger-test-{}", Uuid::new_v4()));
        let path = dir.join("artifact_metadata_test.json");
        Ledger::save(&record, &path).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let loaded: ArtifactMetadata = serde_json::from_str(&contents).unwrap();
        assert_eq!(loaded.run_id, record.run_id);
        assert_eq!(loaded.models_used.len(), 1);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}

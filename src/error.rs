//! Top-level error type for the demo binary and any future CLI entry
//! point. Composes every crate's root error transparently (§7); the
//! only variant that doesn't wrap a sub-crate error is the pure input
//! error surface named by §7's taxonomy — target file missing or
//! unreadable.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("target file {path:?} not found or unreadable: {source}")]
    TargetFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] core_config::ConfigError),

    #[error(transparent)]
    Ledger(#[from] provenance_ledger::LedgerError),
}

//! CLI-specific error types

use thiserror::Error;

use crate::core::SnapshotError;
use crate::journal::JournalError;
use crate::store::StoreError;

/// Result type for CLI commands
pub type CliResult<T> = Result<T, CliError>;

/// Top-level errors surfaced to the terminal.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("store failed: {0}")]
    Store(#[from] StoreError),

    #[error("journal failed: {0}")]
    Journal(#[from] JournalError),

    #[error("snapshot storage failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("io failed: {0}")]
    Io(#[from] std::io::Error),
}

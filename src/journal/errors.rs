//! Journal error types
//!
//! Journal failures are never fatal to the node: the replicated log remains
//! the source of truth, so append errors are logged and skipped. Corruption
//! matters to readers (audit/replay), which stop at the first bad frame.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for journal operations
pub type JournalResult<T> = Result<T, JournalError>;

/// Durability-journal errors.
#[derive(Debug, Error)]
pub enum JournalError {
    /// The journal file could not be opened or created.
    #[error("journal open failed at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An append (write, flush or fsync) failed. The record is skipped.
    #[error("journal append failed: {0}")]
    Append(#[source] io::Error),

    /// A read from the journal file failed.
    #[error("journal read failed: {0}")]
    Read(#[source] io::Error),

    /// A frame failed structural or checksum validation.
    #[error("corrupt journal record at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },
}

impl JournalError {
    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        JournalError::Corrupt {
            offset,
            reason: reason.into(),
        }
    }
}

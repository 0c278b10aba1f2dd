//! Append-only journal writer
//!
//! One journal file per node identity: `register-<node_id>.journal` under
//! the data directory. Every append is flushed and fsynced before it
//! returns; a record is either durable or reported as failed.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::errors::{JournalError, JournalResult};
use super::record::JournalRecord;

/// Appends reunited write records to the node's journal.
pub struct JournalWriter {
    path: PathBuf,
    file: File,
}

impl JournalWriter {
    /// Opens or creates `<data_dir>/register-<node_id>.journal`.
    pub fn open(data_dir: &Path, node_id: u64) -> JournalResult<Self> {
        fs::create_dir_all(data_dir).map_err(|e| JournalError::Open {
            path: data_dir.to_path_buf(),
            source: e,
        })?;

        let path = journal_path(data_dir, node_id);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| JournalError::Open {
                path: path.clone(),
                source: e,
            })?;

        Ok(Self { path, file })
    }

    /// Returns the journal file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record, flushed and fsynced before returning.
    pub fn append(&mut self, record: &JournalRecord) -> JournalResult<()> {
        let frame = record.encode();
        self.file.write_all(&frame).map_err(JournalError::Append)?;
        self.file.flush().map_err(JournalError::Append)?;
        self.file.sync_all().map_err(JournalError::Append)?;
        Ok(())
    }
}

/// Journal location for a node identity.
pub fn journal_path(data_dir: &Path, node_id: u64) -> PathBuf {
    data_dir.join(format!("register-{}.journal", node_id))
}

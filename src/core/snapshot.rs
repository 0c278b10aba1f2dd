//! Snapshot storage at the core boundary
//!
//! The store treats snapshots as opaque bytes; the core decides when to ask
//! for one and where it lives. [`FileSnapshotStore`] keeps the latest snapshot
//! in a single file, replaced atomically: write to a temp file, fsync it,
//! rename over the old snapshot, fsync the directory. A reader never observes
//! a partially written snapshot.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for snapshot storage operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Snapshot storage errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem failure while loading or saving
    #[error("snapshot io failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SnapshotError {
    fn io(path: &Path, source: io::Error) -> Self {
        SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Where the replication core keeps the latest snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Returns the latest snapshot, or `None` if no snapshot has been taken.
    fn load(&self) -> SnapshotResult<Option<Vec<u8>>>;

    /// Persists `data` as the latest snapshot, replacing any previous one.
    fn save(&self, data: &[u8]) -> SnapshotResult<()>;
}

/// File-backed snapshot store: one snapshot file, atomically replaced.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Uses `<data_dir>/snapshot.bin`, creating `data_dir` if needed.
    pub fn open(data_dir: &Path) -> SnapshotResult<Self> {
        fs::create_dir_all(data_dir).map_err(|e| SnapshotError::io(data_dir, e))?;
        Ok(Self {
            path: data_dir.join("snapshot.bin"),
        })
    }

    /// Returns the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> SnapshotResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SnapshotError::io(&self.path, e)),
        }
    }

    fn save(&self, data: &[u8]) -> SnapshotResult<()> {
        let tmp = self.path.with_extension("tmp");

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| SnapshotError::io(&tmp, e))?;
        file.write_all(data).map_err(|e| SnapshotError::io(&tmp, e))?;
        file.sync_all().map_err(|e| SnapshotError::io(&tmp, e))?;
        drop(file);

        fs::rename(&tmp, &self.path)
            .map_err(|e| SnapshotError::io(&self.path, e))?;

        // fsync the directory so the rename itself is durable
        if let Some(dir) = self.path.parent() {
            let dir_handle = File::open(dir).map_err(|e| SnapshotError::io(dir, e))?;
            dir_handle.sync_all().map_err(|e| SnapshotError::io(dir, e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_snapshot_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::open(dir.path()).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::open(dir.path()).unwrap();

        store.save(b"{\"version\":3}").unwrap();
        assert_eq!(store.load().unwrap().unwrap(), b"{\"version\":3}");
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::open(dir.path()).unwrap();

        store.save(b"old").unwrap();
        store.save(b"new").unwrap();
        assert_eq!(store.load().unwrap().unwrap(), b"new");
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::open(dir.path()).unwrap();

        store.save(b"data").unwrap();
        assert!(!store.path().with_extension("tmp").exists());
    }
}

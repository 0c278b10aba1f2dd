//! Store error types
//!
//! Two families: retryable caller errors (proposal rejected, waiter
//! conflicts, timeouts) and fatal protocol errors (undecodable committed
//! entry or snapshot, replication-core failure). `is_fatal` is the split the
//! process supervisor acts on: a fatal store error terminates the node.

use thiserror::Error;

use crate::core::{CoreError, SnapshotError};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Resource-version store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Proposal submission was rejected; the write may be retried.
    #[error("proposal not accepted: {0}")]
    Propose(#[source] CoreError),

    /// A waiter for this key is already registered.
    #[error("a waiter is already registered for key {0}")]
    WaiterExists(String),

    /// No commit resolved the waiter within the caller's timeout.
    #[error("timed out waiting for commit of key {0}")]
    WaitTimeout(String),

    /// The waiter slot was torn down before any commit resolved it.
    #[error("wait abandoned for key {0}")]
    WaitAbandoned(String),

    /// A committed entry did not decode as a resource. The log is corrupt or
    /// incompatible; there is no safe local recovery.
    #[error("undecodable committed entry at version {version}")]
    CorruptEntry {
        version: u64,
        #[source]
        source: serde_json::Error,
    },

    /// A snapshot did not decode as a versioned resource.
    #[error("undecodable snapshot")]
    CorruptSnapshot(#[source] serde_json::Error),

    /// Snapshot storage failed during bootstrap or reload.
    #[error("snapshot storage failed")]
    Snapshot(#[from] SnapshotError),

    /// The replication core reported a fault on its error stream.
    #[error("replication core failed")]
    CoreFailed(#[source] CoreError),
}

impl StoreError {
    /// True when the process must terminate rather than continue on
    /// inconsistent state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::CorruptEntry { .. }
                | StoreError::CorruptSnapshot(_)
                | StoreError::Snapshot(_)
                | StoreError::CoreFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_errors_are_not_fatal() {
        assert!(!StoreError::Propose(CoreError::ProposalRejected).is_fatal());
        assert!(!StoreError::WaiterExists("k".into()).is_fatal());
        assert!(!StoreError::WaitTimeout("k".into()).is_fatal());
        assert!(!StoreError::WaitAbandoned("k".into()).is_fatal());
    }

    #[test]
    fn test_protocol_errors_are_fatal() {
        let decode_err = serde_json::from_slice::<crate::store::Resource>(b"junk").unwrap_err();
        assert!(StoreError::CorruptEntry {
            version: 3,
            source: decode_err,
        }
        .is_fatal());

        let snap_err = serde_json::from_slice::<crate::store::Resource>(b"junk").unwrap_err();
        assert!(StoreError::CorruptSnapshot(snap_err).is_fatal());
        assert!(StoreError::CoreFailed(CoreError::Failed("down".into())).is_fatal());
    }
}

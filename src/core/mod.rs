//! Replication core boundary
//!
//! monoreg does not implement consensus. It consumes an external replication
//! core through a small set of contracts defined here:
//!
//! - proposals are submitted through a [`CoreHandle`]
//! - agreed entries arrive as an ordered stream of [`CommitEvent`]s, each
//!   batch carrying a completion signal the applier must fire after the whole
//!   batch is applied (the core's backpressure contract)
//! - anything received on the error stream is fatal for the process
//! - compaction state round-trips through a [`SnapshotStore`]
//!
//! [`LocalCore`] is a single-node, in-process stand-in that satisfies
//! these contracts for the demo binary and the integration tests. It totally
//! orders proposals by assigning consecutive versions; it is not a consensus
//! implementation.

mod local;
mod snapshot;

pub use local::{LocalCore, LocalCoreChannels};
pub use snapshot::{FileSnapshotStore, SnapshotError, SnapshotResult, SnapshotStore};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Result type for core-boundary operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors crossing the replication-core boundary.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// The proposal channel rejected a submission (core shut down).
    #[error("proposal channel closed")]
    ProposalRejected,

    /// The membership-change channel rejected a submission.
    #[error("membership-change channel closed")]
    ConfChangeRejected,

    /// A fault reported on the core's error stream. Always fatal.
    #[error("replication core failed: {0}")]
    Failed(String),
}

/// One agreed log entry: the proposed bytes plus the log position the core
/// assigned to them.
#[derive(Debug)]
pub struct CommitEntry {
    /// Serialized resource as originally proposed
    pub data: Vec<u8>,
    /// Log position, used as the resource version
    pub version: u64,
}

/// An ordered batch of agreed entries.
///
/// The applier must send on `applied` only after every entry in the batch has
/// been applied; the core will not deliver further work for an unacknowledged
/// batch.
#[derive(Debug)]
pub struct CommitBatch {
    /// Entries in log order
    pub entries: Vec<CommitEntry>,
    /// Completion signal back to the core
    pub applied: oneshot::Sender<()>,
}

/// One delivery on the commit stream.
#[derive(Debug)]
pub enum CommitEvent {
    /// Apply these entries in order, then fire the completion signal.
    Apply(CommitBatch),
    /// Control signal: discard in-memory state and reload from the latest
    /// snapshot. Carries no entries.
    ReloadSnapshot,
}

/// Kind of cluster membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfChangeKind {
    AddNode,
    RemoveNode,
}

/// A requested cluster membership change.
#[derive(Debug, Clone)]
pub struct ConfChange {
    pub node_id: u64,
    pub kind: ConfChangeKind,
    /// Opaque context forwarded to the core (e.g. the new node's peer URL)
    pub context: Vec<u8>,
}

/// Submission front-end to the replication core.
///
/// Cheap to clone; every proposer holds its own handle. Submission failure
/// means the core has shut down and is reported as a retryable error, never a
/// panic.
#[derive(Debug, Clone)]
pub struct CoreHandle {
    proposals: mpsc::UnboundedSender<Vec<u8>>,
    conf_changes: mpsc::UnboundedSender<ConfChange>,
}

impl CoreHandle {
    /// Builds a handle from the core's submission channels.
    pub fn new(
        proposals: mpsc::UnboundedSender<Vec<u8>>,
        conf_changes: mpsc::UnboundedSender<ConfChange>,
    ) -> Self {
        Self {
            proposals,
            conf_changes,
        }
    }

    /// Submits serialized resource bytes for replication.
    ///
    /// Ordering across concurrent proposers is decided by the core's total
    /// order, not by submission order here.
    pub fn propose(&self, data: Vec<u8>) -> CoreResult<()> {
        self.proposals
            .send(data)
            .map_err(|_| CoreError::ProposalRejected)
    }

    /// Submits a cluster membership change.
    pub fn propose_conf_change(&self, change: ConfChange) -> CoreResult<()> {
        self.conf_changes
            .send(change)
            .map_err(|_| CoreError::ConfChangeRejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propose_after_core_shutdown_is_rejected() {
        let (prop_tx, prop_rx) = mpsc::unbounded_channel();
        let (conf_tx, _conf_rx) = mpsc::unbounded_channel();
        let handle = CoreHandle::new(prop_tx, conf_tx);

        drop(prop_rx);
        assert!(matches!(
            handle.propose(b"x".to_vec()),
            Err(CoreError::ProposalRejected)
        ));
    }

    #[test]
    fn test_conf_change_after_core_shutdown_is_rejected() {
        let (prop_tx, _prop_rx) = mpsc::unbounded_channel();
        let (conf_tx, conf_rx) = mpsc::unbounded_channel();
        let handle = CoreHandle::new(prop_tx, conf_tx);

        drop(conf_rx);
        let change = ConfChange {
            node_id: 2,
            kind: ConfChangeKind::RemoveNode,
            context: Vec::new(),
        };
        assert!(matches!(
            handle.propose_conf_change(change),
            Err(CoreError::ConfChangeRejected)
        ));
    }
}

//! Single-node local core
//!
//! An in-process stand-in for the replication core, used by the demo binary
//! and the integration tests. It assigns consecutive versions to proposals in
//! arrival order and honors the batch completion signal: no further batch is
//! delivered until the applier acknowledges the previous one. Membership
//! changes are accepted and logged; a single-node core has nothing to
//! reconfigure.

use tokio::sync::{mpsc, oneshot};

use crate::observability::Logger;

use super::{CommitBatch, CommitEntry, CommitEvent, ConfChange, ConfChangeKind, CoreError, CoreHandle};

/// Channel ends a store needs to consume a running core.
pub struct LocalCoreChannels {
    /// Submission front-end (clone per proposer)
    pub handle: CoreHandle,
    /// Ordered commit stream
    pub commits: mpsc::UnboundedReceiver<CommitEvent>,
    /// Fatal error stream; closes cleanly on orderly shutdown
    pub errors: mpsc::UnboundedReceiver<CoreError>,
}

/// Single-node ordering service.
pub struct LocalCore;

impl LocalCore {
    /// Spawns the core task. Versions start at `first_version` (pass the
    /// recovered snapshot version plus one when resuming).
    pub fn spawn(first_version: u64) -> LocalCoreChannels {
        let (prop_tx, prop_rx) = mpsc::unbounded_channel();
        let (conf_tx, conf_rx) = mpsc::unbounded_channel();
        let (commit_tx, commit_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();

        tokio::spawn(run(first_version, prop_rx, conf_rx, commit_tx, error_tx));

        LocalCoreChannels {
            handle: CoreHandle::new(prop_tx, conf_tx),
            commits: commit_rx,
            errors: error_rx,
        }
    }
}

async fn run(
    first_version: u64,
    mut proposals: mpsc::UnboundedReceiver<Vec<u8>>,
    mut conf_changes: mpsc::UnboundedReceiver<ConfChange>,
    commits: mpsc::UnboundedSender<CommitEvent>,
    _errors: mpsc::UnboundedSender<CoreError>,
) {
    let mut next_version = first_version;
    let mut conf_open = true;

    loop {
        tokio::select! {
            proposal = proposals.recv() => {
                let Some(first) = proposal else { break };

                // Batch whatever has queued up behind the first proposal.
                let mut entries = vec![CommitEntry { data: first, version: next_version }];
                next_version += 1;
                while let Ok(more) = proposals.try_recv() {
                    entries.push(CommitEntry { data: more, version: next_version });
                    next_version += 1;
                }

                let (applied_tx, applied_rx) = oneshot::channel();
                let batch = CommitBatch { entries, applied: applied_tx };
                if commits.send(CommitEvent::Apply(batch)).is_err() {
                    break;
                }
                // Backpressure: wait for the applier before delivering more.
                if applied_rx.await.is_err() {
                    break;
                }
            }
            change = conf_changes.recv(), if conf_open => {
                match change {
                    Some(change) => log_conf_change(&change),
                    None => conf_open = false,
                }
            }
        }
    }
    // Dropping the commit and error senders closes both streams, which the
    // applier treats as an orderly shutdown.
}

fn log_conf_change(change: &ConfChange) {
    let node_id = change.node_id.to_string();
    let kind = match change.kind {
        ConfChangeKind::AddNode => "add",
        ConfChangeKind::RemoveNode => "remove",
    };
    Logger::info(
        "MEMBERSHIP_CHANGE_ACCEPTED",
        &[("kind", kind), ("node_id", &node_id)],
    );
}

//! Resource-version store
//!
//! Owns the single authoritative [`VersionedResource`]. All mutation flows
//! through the replication core: `write` and `next` submit proposals, the
//! applier consumes the core's ordered commit stream and is the only writer
//! of the current value (snapshot installation aside). Out-of-band payloads
//! wait in the [`WriteAheadBuffer`] until the applier forwards their commit
//! to the durability logger.
//!
//! Lock discipline: the current-value `RwLock`, the waiter registry lock and
//! the buffer lock are never held together; each critical section touches
//! exactly one. No lock is held across an `.await`.

mod errors;
mod pending;
mod resource;
mod waiter;

pub use errors::{StoreError, StoreResult};
pub use pending::WriteAheadBuffer;
pub use resource::{utc_now_nanos, Resource, VersionedResource};
pub use waiter::WaiterRegistry;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::{CommitEntry, CommitEvent, CoreError, CoreHandle, SnapshotStore};
use crate::observability::Logger;

/// The replicated single-value register.
pub struct RegisterStore {
    node_id: u64,
    current: RwLock<Option<VersionedResource>>,
    waiters: WaiterRegistry,
    pending: Arc<WriteAheadBuffer>,
    core: CoreHandle,
    reunions: mpsc::Sender<VersionedResource>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl RegisterStore {
    /// Builds the store and bootstraps the current value from the latest
    /// snapshot, if one exists. Snapshot decode failure is fatal.
    ///
    /// `pending` is shared with the durability logger, which takes payloads
    /// back out as commits reunite with them. `reunions` is the bounded
    /// channel feeding that logger.
    pub fn new(
        node_id: u64,
        core: CoreHandle,
        snapshots: Arc<dyn SnapshotStore>,
        pending: Arc<WriteAheadBuffer>,
        reunions: mpsc::Sender<VersionedResource>,
    ) -> StoreResult<Self> {
        let store = Self {
            node_id,
            current: RwLock::new(None),
            waiters: WaiterRegistry::new(),
            pending,
            core,
            reunions,
            snapshots,
        };
        store.load_snapshot()?;
        Ok(store)
    }

    /// This node's identity, used to prefix write keys and name the journal.
    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    /// Non-blocking read of the current value. `None` before the first
    /// commit or snapshot.
    pub fn current(&self) -> Option<VersionedResource> {
        read(&self.current).clone()
    }

    /// Stages `payload` and proposes a write. Fire-and-forget: the assigned
    /// version is observable later via `current` or a `next` on the key.
    ///
    /// The key is globally unique without coordination: node identity plus a
    /// random component.
    pub fn write(&self, payload: Vec<u8>) -> StoreResult<()> {
        let key = format!("{}-{}", self.node_id, Uuid::new_v4());
        let resource = Resource::new(key.as_str());

        self.pending.stage(&key, payload);
        if let Err(e) = self.core.propose(resource.encode()) {
            // Rejected proposals never commit; the staged payload would leak.
            self.pending.take_if_present(&key);
            return Err(StoreError::Propose(e));
        }
        Ok(())
    }

    /// Proposes a write for `key` and blocks until the matching commit
    /// delivers its assigned version, or `timeout` expires.
    ///
    /// At most one waiter may be pending per key; a concurrent second call
    /// fails with `WaiterExists`. On expiry the waiter is deregistered
    /// atomically with the check, so a commit that raced the timeout is
    /// still returned and a late one finds no slot to deliver into.
    pub async fn next(&self, key: &str, timeout: Duration) -> StoreResult<u64> {
        let mut rx = self.waiters.register(key)?;

        let resource = Resource::new(key);
        if let Err(e) = self.core.propose(resource.encode()) {
            self.waiters.cancel(key);
            return Err(StoreError::Propose(e));
        }

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(version)) => Ok(version),
            Ok(Err(_)) => Err(StoreError::WaitAbandoned(key.to_string())),
            Err(_) => {
                if self.waiters.cancel(key) {
                    Err(StoreError::WaitTimeout(key.to_string()))
                } else {
                    // The slot is gone: a concurrent resolve already sent.
                    match rx.try_recv() {
                        Ok(version) => Ok(version),
                        Err(_) => Err(StoreError::WaitAbandoned(key.to_string())),
                    }
                }
            }
        }
    }

    /// Serializes the current value for the core to persist as a compaction
    /// point. Reads under the same lock as `current`.
    pub fn snapshot(&self) -> Vec<u8> {
        let current = read(&self.current);
        serde_json::to_vec(&*current).expect("snapshot JSON encoding cannot fail")
    }

    /// Consumes the core's commit stream until it closes, then drains the
    /// error stream. Returns `Err` on fatal conditions (corrupt entry or
    /// snapshot, core fault); the supervisor terminates the process on any
    /// of them.
    pub async fn apply_commits(
        self: Arc<Self>,
        mut commits: mpsc::UnboundedReceiver<CommitEvent>,
        mut errors: mpsc::UnboundedReceiver<CoreError>,
    ) -> StoreResult<()> {
        while let Some(event) = commits.recv().await {
            match event {
                CommitEvent::ReloadSnapshot => self.load_snapshot()?,
                CommitEvent::Apply(batch) => {
                    for entry in batch.entries {
                        self.apply_entry(entry)?;
                    }
                    // Completion signal: the core will not deliver the next
                    // batch until this fires.
                    let _ = batch.applied.send(());
                }
            }
        }

        match errors.recv().await {
            Some(err) => Err(StoreError::CoreFailed(err)),
            None => Ok(()),
        }
    }

    /// Applies one committed entry: replace the current value, resolve the
    /// key's waiter if any, and hand locally originated writes to the
    /// durability logger.
    fn apply_entry(&self, entry: CommitEntry) -> StoreResult<()> {
        let resource = Resource::decode(&entry.data).map_err(|e| StoreError::CorruptEntry {
            version: entry.version,
            source: e,
        })?;
        let committed = VersionedResource {
            resource,
            version: entry.version,
        };

        {
            let mut current = write(&self.current);
            if let Some(existing) = current.as_ref() {
                if committed.version < existing.version {
                    Logger::warn(
                        "STALE_COMMIT_SKIPPED",
                        &[
                            ("commit_version", &committed.version.to_string()),
                            ("current_version", &existing.version.to_string()),
                            ("key", committed.key()),
                        ],
                    );
                    return Ok(());
                }
            }
            *current = Some(committed.clone());
        }

        self.waiters.resolve(committed.key(), committed.version);

        // Only writes staged here are this node's own not-yet-durable ones.
        if self.pending.contains(committed.key()) {
            if let Err(e) = self.reunions.try_send(committed) {
                // Durability may lag; the authoritative value never does.
                // The swept buffer reclaims the entry this drop leaks.
                Logger::warn("REUNION_DROPPED", &[("reason", &e.to_string())]);
            }
        }
        Ok(())
    }

    /// Installs the latest snapshot as the current value. Used at
    /// construction and on the core's reload signal. Bypasses waiters and
    /// the write-ahead buffer: snapshot state is externally originated, not
    /// a caller's pending write.
    fn load_snapshot(&self) -> StoreResult<()> {
        let Some(data) = self.snapshots.load()? else {
            return Ok(());
        };
        let recovered: Option<VersionedResource> =
            serde_json::from_slice(&data).map_err(StoreError::CorruptSnapshot)?;
        let Some(value) = recovered else {
            return Ok(());
        };

        Logger::info(
            "SNAPSHOT_INSTALLED",
            &[
                ("key", value.key()),
                ("version", &value.version.to_string()),
            ],
        );
        *write(&self.current) = Some(value);
        Ok(())
    }

    /// Pending waiter count, exposed for tests and diagnostics.
    pub fn pending_waiters(&self) -> usize {
        self.waiters.len()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

//! Durability logger task
//!
//! Drains the bounded reunion channel fed by commit application. For each
//! committed write it takes the staged payload back out of the write-ahead
//! buffer and appends one journal record. A miss means the commit did not
//! originate a pending local payload (peer write, or a replayed commit) and
//! is dropped silently.
//!
//! This task runs beside commit application, never in it: a slow or failing
//! journal delays durability records, not the authoritative value.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::observability::Logger;
use crate::store::{VersionedResource, WriteAheadBuffer};

use super::record::JournalRecord;
use super::writer::JournalWriter;

/// Reunites committed writes with their staged payloads and journals them.
pub struct DurabilityLogger {
    pending: Arc<WriteAheadBuffer>,
    writer: JournalWriter,
}

impl DurabilityLogger {
    pub fn new(pending: Arc<WriteAheadBuffer>, writer: JournalWriter) -> Self {
        Self { pending, writer }
    }

    /// Consumes the reunion channel until it closes. Append failures are
    /// logged and skipped; they never stop the task or the node.
    pub async fn run(mut self, mut reunions: mpsc::Receiver<VersionedResource>) {
        while let Some(committed) = reunions.recv().await {
            let Some(payload) = self.pending.take_if_present(committed.key()) else {
                continue;
            };

            let record = JournalRecord {
                version: committed.version,
                timestamp: committed.resource.timestamp,
                key: committed.resource.key,
                payload,
            };
            if let Err(e) = self.writer.append(&record) {
                Logger::error(
                    "JOURNAL_APPEND_FAILED",
                    &[
                        ("error", &e.to_string()),
                        ("key", &record.key),
                        ("version", &record.version.to_string()),
                    ],
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{journal_path, JournalReader};
    use crate::store::Resource;
    use tempfile::TempDir;

    fn committed(key: &str, version: u64) -> VersionedResource {
        VersionedResource {
            resource: Resource {
                key: key.to_string(),
                timestamp: 42,
            },
            version,
        }
    }

    #[tokio::test]
    async fn test_staged_payload_is_reunited_and_journaled() {
        let dir = TempDir::new().unwrap();
        let pending = Arc::new(WriteAheadBuffer::new());
        pending.stage("1-k", b"the payload".to_vec());

        let writer = JournalWriter::open(dir.path(), 1).unwrap();
        let logger = DurabilityLogger::new(pending.clone(), writer);
        let (tx, rx) = mpsc::channel(4);

        let task = tokio::spawn(logger.run(rx));
        tx.send(committed("1-k", 7)).await.unwrap();
        drop(tx);
        task.await.unwrap();

        let records = JournalReader::open(&journal_path(dir.path(), 1))
            .unwrap()
            .read_all()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].version, 7);
        assert_eq!(records[0].key, "1-k");
        assert_eq!(records[0].payload, b"the payload");
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_unstaged_commit_is_dropped_silently() {
        let dir = TempDir::new().unwrap();
        let pending = Arc::new(WriteAheadBuffer::new());

        let writer = JournalWriter::open(dir.path(), 1).unwrap();
        let logger = DurabilityLogger::new(pending, writer);
        let (tx, rx) = mpsc::channel(4);

        let task = tokio::spawn(logger.run(rx));
        tx.send(committed("2-peer", 3)).await.unwrap();
        drop(tx);
        task.await.unwrap();

        let records = JournalReader::open(&journal_path(dir.path(), 1))
            .unwrap()
            .read_all()
            .unwrap();
        assert!(records.is_empty());
    }
}

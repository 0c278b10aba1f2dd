//! Write-ahead buffer
//!
//! Holds full payloads for writes proposed by this node, keyed by the write
//! key, from `Write` staging them until the durability logger reunites them
//! with the matching commit. The payload never travels through the
//! replicated log; only the descriptor does.
//!
//! Invariant: every key in the buffer was generated by this process instance
//! and has not yet been reunited with a commit.
//!
//! A key whose commit never arrives (proposal dropped by a leadership
//! change) would leak forever; `sweep_older_than` is the eviction path and a
//! periodic sweep task logs what it evicts.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct PendingPayload {
    payload: Vec<u8>,
    staged_at: Instant,
}

/// Concurrent key → pending-payload map with its own lock.
pub struct WriteAheadBuffer {
    entries: Mutex<HashMap<String, PendingPayload>>,
}

impl WriteAheadBuffer {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, PendingPayload>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Stages a payload under a freshly generated write key.
    pub fn stage(&self, key: &str, payload: Vec<u8>) {
        self.entries().insert(
            key.to_string(),
            PendingPayload {
                payload,
                staged_at: Instant::now(),
            },
        );
    }

    /// Atomically removes and returns the payload for `key`, if staged.
    pub fn take_if_present(&self, key: &str) -> Option<Vec<u8>> {
        self.entries().remove(key).map(|entry| entry.payload)
    }

    /// True while a payload for `key` awaits its commit.
    pub fn contains(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }

    /// Evicts entries staged longer than `max_age` ago and returns their
    /// keys. Evicted writes are abandoned, not durable.
    pub fn sweep_older_than(&self, max_age: Duration) -> Vec<String> {
        let mut entries = self.entries();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.staged_at.elapsed() > max_age)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.remove(key);
        }
        expired
    }

    /// Number of staged payloads.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// True when nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WriteAheadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_then_take_removes_entry() {
        let buffer = WriteAheadBuffer::new();
        buffer.stage("k", b"payload".to_vec());

        assert!(buffer.contains("k"));
        assert_eq!(buffer.take_if_present("k").unwrap(), b"payload");
        assert!(!buffer.contains("k"));
        assert!(buffer.take_if_present("k").is_none());
    }

    #[test]
    fn test_take_missing_key_returns_none() {
        let buffer = WriteAheadBuffer::new();
        assert!(buffer.take_if_present("nope").is_none());
    }

    #[test]
    fn test_restaging_replaces_payload() {
        let buffer = WriteAheadBuffer::new();
        buffer.stage("k", b"old".to_vec());
        buffer.stage("k", b"new".to_vec());

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.take_if_present("k").unwrap(), b"new");
    }

    #[test]
    fn test_sweep_evicts_only_aged_entries() {
        let buffer = WriteAheadBuffer::new();
        buffer.stage("old", b"a".to_vec());
        std::thread::sleep(Duration::from_millis(30));
        buffer.stage("fresh", b"b".to_vec());

        let evicted = buffer.sweep_older_than(Duration::from_millis(20));
        assert_eq!(evicted, vec!["old".to_string()]);
        assert!(!buffer.contains("old"));
        assert!(buffer.contains("fresh"));
    }

    #[test]
    fn test_sweep_with_long_age_evicts_nothing() {
        let buffer = WriteAheadBuffer::new();
        buffer.stage("k", b"a".to_vec());

        assert!(buffer.sweep_older_than(Duration::from_secs(3600)).is_empty());
        assert!(buffer.contains("k"));
    }
}

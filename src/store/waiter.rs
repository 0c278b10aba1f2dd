//! Waiter registry
//!
//! Correlates an in-flight proposal with the commit that resolves it. Each
//! registration owns a single-shot delivery slot; commit application looks
//! the key up and delivers directly. There is no shared notification channel
//! for blocked callers to race over.
//!
//! Invariant: at most one waiter per key. A second registration for a live
//! key is a caller error and fails loudly.
//!
//! `resolve` removes the slot and sends while still holding the registry
//! lock. That makes cancellation atomic with delivery: if `cancel` finds the
//! slot gone, the version is already buffered in the caller's receiver, so a
//! timed-out caller can distinguish "commit won the race" from a true
//! timeout, and a late commit can never deliver into a discarded slot.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;

use super::errors::{StoreError, StoreResult};

/// Per-key single-shot delivery slots for pending proposals.
pub struct WaiterRegistry {
    slots: Mutex<HashMap<String, oneshot::Sender<u64>>>,
}

impl WaiterRegistry {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<u64>>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Registers a waiter for `key` and returns the delivery end.
    ///
    /// Fails with `WaiterExists` if a waiter for the key is still pending.
    pub fn register(&self, key: &str) -> StoreResult<oneshot::Receiver<u64>> {
        let mut slots = self.slots();
        if slots.contains_key(key) {
            return Err(StoreError::WaiterExists(key.to_string()));
        }
        let (tx, rx) = oneshot::channel();
        slots.insert(key.to_string(), tx);
        Ok(rx)
    }

    /// Delivers `version` to the waiter for `key`, if one is registered.
    ///
    /// Returns whether a waiter was present. Absence is a normal no-op: the
    /// write originated on a peer, or the caller already gave up. A receiver
    /// dropped mid-delivery also counts as resolved; the slot is gone either
    /// way.
    pub fn resolve(&self, key: &str, version: u64) -> bool {
        let mut slots = self.slots();
        match slots.remove(key) {
            Some(tx) => {
                let _ = tx.send(version);
                true
            }
            None => false,
        }
    }

    /// Removes the waiter for `key` without delivering.
    ///
    /// Returns false when no slot was present, which after a timed-out wait
    /// means a concurrent `resolve` already delivered.
    pub fn cancel(&self, key: &str) -> bool {
        self.slots().remove(key).is_some()
    }

    /// Number of pending waiters.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    /// True when no waiter is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WaiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_resolve_delivers_version() {
        let registry = WaiterRegistry::new();
        let mut rx = registry.register("k").unwrap();

        assert!(registry.resolve("k", 7));
        assert_eq!(rx.try_recv().unwrap(), 7);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_registration_fails_loudly() {
        let registry = WaiterRegistry::new();
        let _rx = registry.register("k").unwrap();

        assert!(matches!(
            registry.register("k"),
            Err(StoreError::WaiterExists(_))
        ));
    }

    #[test]
    fn test_resolved_key_accepts_new_waiter() {
        let registry = WaiterRegistry::new();
        let _rx = registry.register("k").unwrap();
        registry.resolve("k", 1);

        assert!(registry.register("k").is_ok());
    }

    #[test]
    fn test_resolve_without_waiter_is_noop() {
        let registry = WaiterRegistry::new();
        assert!(!registry.resolve("unknown", 3));
    }

    #[test]
    fn test_cancel_removes_slot() {
        let registry = WaiterRegistry::new();
        let _rx = registry.register("k").unwrap();

        assert!(registry.cancel("k"));
        assert!(!registry.cancel("k"));
        assert!(!registry.resolve("k", 9));
    }

    #[test]
    fn test_resolve_with_dropped_receiver_still_clears_slot() {
        let registry = WaiterRegistry::new();
        let rx = registry.register("k").unwrap();
        drop(rx);

        assert!(registry.resolve("k", 4));
        assert!(registry.is_empty());
    }
}

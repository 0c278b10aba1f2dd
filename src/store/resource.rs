//! Resource types carried through the replicated log
//!
//! A [`Resource`] is the minimal write descriptor that travels through
//! consensus: the locally generated key plus the proposer's wall-clock
//! timestamp. The full payload stays in the proposer's write-ahead buffer and
//! never enters the log. A [`VersionedResource`] is a Resource annotated with
//! the log position the core assigned to it; both are immutable once built.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Minimal write descriptor replicated through the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Globally unique write key: `<node_id>-<uuid>`
    pub key: String,
    /// Proposal time, UTC nanoseconds
    pub timestamp: i64,
}

impl Resource {
    /// Creates a descriptor for `key` stamped with the current time.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            timestamp: utc_now_nanos(),
        }
    }

    /// Wire encoding used on the proposal channel.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("resource JSON encoding cannot fail")
    }

    /// Decodes a committed log entry. Failure means the log is corrupt or
    /// from an incompatible build; callers treat it as fatal.
    pub fn decode(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }
}

/// A resource paired with its consensus-assigned log position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedResource {
    #[serde(flatten)]
    pub resource: Resource,
    /// Log position of the entry that carried this resource
    pub version: u64,
}

impl VersionedResource {
    /// The write key this version resolves.
    pub fn key(&self) -> &str {
        &self.resource.key
    }
}

/// Current UTC time in nanoseconds. Clamps at `i64::MAX` past year 2262.
pub fn utc_now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_wire_roundtrip() {
        let resource = Resource {
            key: "1-abc".to_string(),
            timestamp: 100,
        };
        let decoded = Resource::decode(&resource.encode()).unwrap();
        assert_eq!(resource, decoded);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Resource::decode(b"\x00\x01not json").is_err());
    }

    #[test]
    fn test_versioned_resource_flattens_fields() {
        let vr = VersionedResource {
            resource: Resource {
                key: "a".to_string(),
                timestamp: 100,
            },
            version: 7,
        };
        let json: serde_json::Value =
            serde_json::from_slice(&serde_json::to_vec(&vr).unwrap()).unwrap();
        assert_eq!(json["key"], "a");
        assert_eq!(json["timestamp"], 100);
        assert_eq!(json["version"], 7);
    }

    #[test]
    fn test_new_resource_stamps_current_time() {
        let before = utc_now_nanos();
        let resource = Resource::new("k");
        assert!(resource.timestamp >= before);
        assert!(resource.timestamp <= utc_now_nanos());
    }
}

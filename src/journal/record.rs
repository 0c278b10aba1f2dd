//! Journal record framing
//!
//! Each record is one self-delimited binary frame holding a reunited write:
//! the consensus-assigned version, the resource metadata and the full
//! payload that never traveled through the log.
//!
//! Frame layout:
//! - total length (u32 LE, includes this field and the checksum)
//! - version (u64 LE)
//! - timestamp (i64 LE)
//! - key length (u32 LE) + key bytes (UTF-8)
//! - payload length (u32 LE) + payload bytes
//! - CRC32 checksum (u32 LE, over everything before it)

use crc32fast::Hasher;

use super::errors::{JournalError, JournalResult};

/// Fixed overhead: length + version + timestamp + two length prefixes + crc.
const MIN_FRAME_LEN: usize = 4 + 8 + 8 + 4 + 4 + 4;

/// One reunited write: version, resource metadata, payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRecord {
    /// Consensus-assigned log position
    pub version: u64,
    /// Proposal timestamp, UTC nanoseconds
    pub timestamp: i64,
    /// Write key
    pub key: String,
    /// Full payload as staged by the original `Write`
    pub payload: Vec<u8>,
}

impl JournalRecord {
    /// Serializes the record into one checksummed frame.
    pub fn encode(&self) -> Vec<u8> {
        let total_len = MIN_FRAME_LEN + self.key.len() + self.payload.len();
        let mut frame = Vec::with_capacity(total_len);

        frame.extend_from_slice(&(total_len as u32).to_le_bytes());
        frame.extend_from_slice(&self.version.to_le_bytes());
        frame.extend_from_slice(&self.timestamp.to_le_bytes());
        frame.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        frame.extend_from_slice(self.key.as_bytes());
        frame.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&self.payload);

        let checksum = crc32(&frame);
        frame.extend_from_slice(&checksum.to_le_bytes());
        frame
    }

    /// Parses one frame from the start of `data`, verifying the checksum.
    /// Returns the record and the number of bytes consumed. `offset` is the
    /// frame's position in the file, used only for error context.
    pub fn decode(data: &[u8], offset: u64) -> JournalResult<(Self, usize)> {
        if data.len() < MIN_FRAME_LEN {
            return Err(JournalError::corrupt(offset, "frame too short"));
        }

        let total_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if total_len < MIN_FRAME_LEN {
            return Err(JournalError::corrupt(
                offset,
                format!("implausible frame length {}", total_len),
            ));
        }
        if data.len() < total_len {
            return Err(JournalError::corrupt(offset, "truncated frame"));
        }

        let checksum_at = total_len - 4;
        let stored = u32::from_le_bytes([
            data[checksum_at],
            data[checksum_at + 1],
            data[checksum_at + 2],
            data[checksum_at + 3],
        ]);
        let computed = crc32(&data[..checksum_at]);
        if stored != computed {
            return Err(JournalError::corrupt(
                offset,
                format!("checksum mismatch: stored {:08x}, computed {:08x}", stored, computed),
            ));
        }

        let mut at = 4;
        let version = u64::from_le_bytes(data[at..at + 8].try_into().expect("8-byte slice"));
        at += 8;
        let timestamp = i64::from_le_bytes(data[at..at + 8].try_into().expect("8-byte slice"));
        at += 8;

        let key_len = u32::from_le_bytes(data[at..at + 4].try_into().expect("4-byte slice")) as usize;
        at += 4;
        if at + key_len + 4 > checksum_at {
            return Err(JournalError::corrupt(offset, "key length exceeds frame"));
        }
        let key = String::from_utf8(data[at..at + key_len].to_vec())
            .map_err(|_| JournalError::corrupt(offset, "key is not UTF-8"))?;
        at += key_len;

        let payload_len =
            u32::from_le_bytes(data[at..at + 4].try_into().expect("4-byte slice")) as usize;
        at += 4;
        if at + payload_len != checksum_at {
            return Err(JournalError::corrupt(offset, "payload length does not match frame"));
        }
        let payload = data[at..at + payload_len].to_vec();

        Ok((
            JournalRecord {
                version,
                timestamp,
                key,
                payload,
            },
            total_len,
        ))
    }
}

/// CRC32 (IEEE) over `data`. Deterministic.
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

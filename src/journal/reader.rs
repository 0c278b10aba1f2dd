//! Sequential journal reader
//!
//! Replays a node's journal in append order for audit and tests. Reading
//! stops cleanly at end of file; a torn or corrupt frame surfaces as an
//! error with the byte offset it was found at.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use super::errors::{JournalError, JournalResult};
use super::record::JournalRecord;

/// Reads journal frames strictly in file order.
pub struct JournalReader {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
}

impl JournalReader {
    /// Opens a journal file for sequential reading.
    pub fn open(path: &Path) -> JournalResult<Self> {
        let file = File::open(path).map_err(|e| JournalError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            offset: 0,
        })
    }

    /// Returns the journal file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current byte offset into the file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next record.
    ///
    /// Returns `Ok(None)` at a clean end of file. A partial frame at the
    /// tail (torn write) or a checksum failure is an error.
    pub fn read_next(&mut self) -> JournalResult<Option<JournalRecord>> {
        let mut len_buf = [0u8; 4];
        let mut got = 0;
        while got < len_buf.len() {
            match self.reader.read(&mut len_buf[got..]) {
                Ok(0) if got == 0 => return Ok(None),
                Ok(0) => {
                    return Err(JournalError::corrupt(self.offset, "torn length prefix"));
                }
                Ok(n) => got += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(JournalError::Read(e)),
            }
        }

        let total_len = u32::from_le_bytes(len_buf) as usize;
        if total_len < 4 {
            return Err(JournalError::corrupt(self.offset, "implausible frame length"));
        }

        let mut frame = vec![0u8; total_len];
        frame[..4].copy_from_slice(&len_buf);
        if let Err(e) = self.reader.read_exact(&mut frame[4..]) {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                return Err(JournalError::corrupt(self.offset, "truncated frame"));
            }
            return Err(JournalError::Read(e));
        }

        let (record, consumed) = JournalRecord::decode(&frame, self.offset)?;
        self.offset += consumed as u64;
        Ok(Some(record))
    }

    /// Reads every remaining record.
    pub fn read_all(&mut self) -> JournalResult<Vec<JournalRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }
}

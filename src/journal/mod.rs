//! Durability journal
//!
//! An append-only, per-node-identity record of reunited writes: each frame
//! binds a consensus-assigned version to the resource metadata and the full
//! payload that was staged out of band. The journal is audit/replay state;
//! the replicated log remains the source of truth, so journal failures
//! degrade durability logging and nothing else.

mod errors;
mod logger;
mod reader;
mod record;
mod writer;

pub use errors::{JournalError, JournalResult};
pub use logger::DurabilityLogger;
pub use record::JournalRecord;
pub use reader::JournalReader;
pub use writer::{journal_path, JournalWriter};

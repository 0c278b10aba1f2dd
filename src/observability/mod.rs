//! Observability for monoreg
//!
//! Structured JSON logging with explicit severities. One log line is one
//! event, written synchronously with deterministic key ordering so output is
//! diffable across runs. The register's authoritative state never depends on
//! whether a log line made it out.

mod logger;

pub use logger::{Logger, Severity};

//! CLI command implementations
//!
//! `start` wires the node together: snapshot store, local core, register
//! store, durability logger, write-ahead-buffer sweeper and HTTP server,
//! then drives commit application on the main task. A fatal store error
//! (corrupt committed entry or snapshot, core fault) logs FATAL and exits
//! non-zero; there is no safe local recovery from those.
//!
//! `audit` replays a node's durability journal to stdout, one JSON object
//! per record.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::core::{FileSnapshotStore, LocalCore, SnapshotStore};
use crate::http::{ApiServer, ApiState, HttpConfig};
use crate::journal::{journal_path, DurabilityLogger, JournalReader, JournalWriter};
use crate::observability::Logger;
use crate::store::{RegisterStore, StoreError, VersionedResource, WriteAheadBuffer};

use super::args::{Cli, Command};
use super::errors::CliResult;

/// Reunion-channel depth: how many committed writes may await durability
/// logging before newer reunions are dropped (and left to the sweeper).
const REUNION_BUFFER: usize = 1024;

/// Parses arguments and dispatches to a command.
pub fn run() -> CliResult<()> {
    match Cli::parse_args().command {
        Command::Start {
            id,
            host,
            port,
            data_dir,
            evict_pending_secs,
        } => start(
            id,
            HttpConfig { host, port },
            &data_dir,
            Duration::from_secs(evict_pending_secs),
        ),
        Command::Audit { id, data_dir } => audit(id, &data_dir),
    }
}

/// Boots a node and serves until the core shuts down or fails.
pub fn start(
    node_id: u64,
    http: HttpConfig,
    data_dir: &Path,
    evict_pending_after: Duration,
) -> CliResult<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(node_id, http, data_dir, evict_pending_after))
}

async fn serve(
    node_id: u64,
    http: HttpConfig,
    data_dir: &Path,
    evict_pending_after: Duration,
) -> CliResult<()> {
    let snapshots = Arc::new(FileSnapshotStore::open(data_dir)?);

    // The local core resumes version assignment after the snapshot point.
    let first_version = recovered_version(snapshots.as_ref())?.map_or(1, |v| v + 1);
    let core = LocalCore::spawn(first_version);

    let pending = Arc::new(WriteAheadBuffer::new());
    let (reunion_tx, reunion_rx) = mpsc::channel(REUNION_BUFFER);

    let store = Arc::new(RegisterStore::new(
        node_id,
        core.handle.clone(),
        snapshots,
        pending.clone(),
        reunion_tx,
    )?);

    let writer = JournalWriter::open(data_dir, node_id)?;
    tokio::spawn(DurabilityLogger::new(pending.clone(), writer).run(reunion_rx));
    tokio::spawn(sweep_pending(pending, evict_pending_after));

    let state = Arc::new(ApiState {
        store: store.clone(),
        core: core.handle.clone(),
    });
    let server = ApiServer::with_config(http, state);
    let http_task = tokio::spawn(async move {
        if let Err(e) = server.start().await {
            Logger::error("HTTP_SERVER_FAILED", &[("error", &e.to_string())]);
        }
    });

    Logger::info(
        "NODE_STARTED",
        &[
            ("data_dir", &data_dir.display().to_string()),
            ("node_id", &node_id.to_string()),
        ],
    );

    let result = store.apply_commits(core.commits, core.errors).await;
    http_task.abort();
    match result {
        Ok(()) => {
            Logger::info("NODE_STOPPED", &[("node_id", &node_id.to_string())]);
            Ok(())
        }
        Err(e) => {
            Logger::fatal("NODE_FAILED", &[("error", &e.to_string())]);
            Err(e.into())
        }
    }
}

/// Version recorded in the latest snapshot, if any.
fn recovered_version(snapshots: &dyn SnapshotStore) -> CliResult<Option<u64>> {
    let Some(data) = snapshots.load()? else {
        return Ok(None);
    };
    let recovered: Option<VersionedResource> =
        serde_json::from_slice(&data).map_err(StoreError::CorruptSnapshot)?;
    Ok(recovered.map(|v| v.version))
}

/// Periodically evicts staged writes whose commit never arrived.
async fn sweep_pending(pending: Arc<WriteAheadBuffer>, evict_after: Duration) {
    let period = evict_after.max(Duration::from_secs(1));
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        for key in pending.sweep_older_than(evict_after) {
            Logger::warn("PENDING_WRITE_ABANDONED", &[("key", &key)]);
        }
    }
}

/// Prints every journal record of `node_id` as one JSON object per line.
pub fn audit(node_id: u64, data_dir: &Path) -> CliResult<()> {
    let path = journal_path(data_dir, node_id);
    if !path.exists() {
        println!("no journal at {}", path.display());
        return Ok(());
    }

    let mut reader = JournalReader::open(&path)?;
    while let Some(record) = reader.read_next()? {
        let line = serde_json::json!({
            "version": record.version,
            "key": record.key,
            "timestamp": record.timestamp,
            "payload": String::from_utf8_lossy(&record.payload),
        });
        println!("{}", line);
    }
    Ok(())
}

//! CLI argument definitions using clap
//!
//! Commands:
//! - monoreg start --id <n> --host <h> --port <p> --data-dir <path>
//! - monoreg audit --id <n> --data-dir <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// monoreg - a replicated, versioned single-value register
#[derive(Parser, Debug)]
#[command(name = "monoreg")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a register node
    Start {
        /// Node identity; prefixes write keys and names the journal
        #[arg(long, default_value_t = 1)]
        id: u64,

        /// HTTP listen host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// HTTP listen port
        #[arg(long, default_value_t = 9121)]
        port: u16,

        /// Directory for the snapshot and the durability journal
        #[arg(long, default_value = "./monoreg-data")]
        data_dir: PathBuf,

        /// Age in seconds after which a staged write with no commit is
        /// evicted from the write-ahead buffer
        #[arg(long, default_value_t = 600)]
        evict_pending_secs: u64,
    },

    /// Print the durability journal of a node
    Audit {
        /// Node identity whose journal to read
        #[arg(long, default_value_t = 1)]
        id: u64,

        /// Directory holding the journal
        #[arg(long, default_value = "./monoreg-data")]
        data_dir: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

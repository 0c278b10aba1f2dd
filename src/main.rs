//! monoreg CLI entry point
//!
//! A minimal entrypoint: parse and dispatch via cli::run, print the error,
//! exit non-zero on failure. Subsystem wiring lives in the CLI module, not
//! here.

use monoreg::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

//! HTTP transport adapter
//!
//! Maps the four supported verbs onto store and membership operations.
//! Stateless beyond the shared handles; request validation and status-code
//! mapping only. No register logic lives here.

mod config;
mod routes;
mod server;

pub use config::HttpConfig;
pub use routes::{register_router, ApiState};
pub use server::ApiServer;

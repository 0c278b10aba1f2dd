//! HTTP server for the register API

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::observability::Logger;

use super::config::HttpConfig;
use super::routes::{register_router, ApiState};

/// Serves the four-verb register API.
pub struct ApiServer {
    config: HttpConfig,
    router: Router,
}

impl ApiServer {
    /// Creates a server with the default listen address.
    pub fn new(state: Arc<ApiState>) -> Self {
        Self::with_config(HttpConfig::default(), state)
    }

    /// Creates a server with a custom listen address.
    pub fn with_config(config: HttpConfig, state: Arc<ApiState>) -> Self {
        Self {
            config,
            router: register_router(state),
        }
    }

    /// The configured listen address.
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// The router, for driving requests in-process (tests).
    pub fn router(self) -> Router {
        self.router
    }

    /// Binds the listener and serves until the process exits.
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid listen address {}: {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        Logger::info("HTTP_LISTENING", &[("addr", &addr.to_string())]);
        axum::serve(listener, self.router).await
    }
}

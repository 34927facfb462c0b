//! HTTP + WebSocket host for the dependency tree view

pub mod assets;
pub mod handlers;
pub mod router;
pub mod websocket;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use pylon_indexer::Indexer;
use tokio::net::TcpListener;

pub use router::create_router;

/// Shared state handed to every route.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub indexer: Arc<Indexer>,
}

impl ServerState {
    pub fn new(indexer: Arc<Indexer>) -> Self {
        ServerState { indexer }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 7890,
        }
    }
}

impl ServerConfig {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

pub struct PylonServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl PylonServer {
    pub fn new(indexer: Arc<Indexer>, config: ServerConfig) -> Self {
        PylonServer {
            state: Arc::new(ServerState::new(indexer)),
            config,
        }
    }

    /// Bind and serve until the process stops.
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.config.host, self.config.port))?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;

        tracing::info!("serving dependency view on {}", self.config.url());
        axum::serve(listener, create_router(self.state)).await?;
        Ok(())
    }
}

//! Server wiring — shared state, router, and accept loop

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::config::ServerConfig;
use crate::core::state::StateStore;
use crate::dispatch::Dispatcher;
use crate::session::SessionConfig;
use crate::ws;

/// State shared by every connection (must be Send + Sync for axum)
pub struct ServerState {
    /// Device state, shared across sessions
    pub store: Arc<StateStore>,
    pub dispatcher: Dispatcher,
    /// Producer timing for new sessions
    pub session: SessionConfig,
    next_session: AtomicU64,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        let store = Arc::new(StateStore::new(config.notification_capacity));
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&store), config.unknown_type_policy),
            store,
            session: SessionConfig::from(config),
            next_session: AtomicU64::new(1),
        }
    }

    pub fn next_session_id(&self) -> u64 {
        self.next_session.fetch_add(1, Ordering::Relaxed)
    }
}

/// WebSocket endpoints at `/` and `/ws`
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(ws::ws_handler))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

pub async fn bind(listen: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind to {}", listen))?;
    info!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Serve until the listener fails
pub async fn serve(listener: TcpListener, state: Arc<ServerState>) -> Result<()> {
    axum::serve(listener, router(state))
        .await
        .context("Server error")
}

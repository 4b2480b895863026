//! Server startup helper for the binary.
//!
//! Provides [`spawn_server`], which binds the listener eagerly and then
//! runs the server on a background Tokio task. Binding before spawning
//! means an unusable port fails start-up instead of a background task.
//!
//! # Usage
//!
//! ```rust,ignore
//! use deli_counter_server::startup::spawn_server;
//! use deli_counter_server::{AppState, ServerConfig};
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new(Arc::default()));
//! let server = spawn_server(&ServerConfig::default(), state, shutdown).await?;
//! server.handle.await??;
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError, serve};
use crate::state::AppState;

/// Errors that can occur when spawning the server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// A server running on a background task.
#[derive(Debug)]
pub struct RunningServer {
    /// The address actually bound (resolves port `0`).
    pub local_addr: SocketAddr,
    /// Completes when the server stops.
    pub handle: JoinHandle<Result<(), ServerError>>,
}

/// Bind the configured address and serve on a background task until
/// `shutdown` resolves.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address is invalid or cannot
/// be bound.
pub async fn spawn_server<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<RunningServer, StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("listener has no local address: {e}")))?;

    let handle = tokio::spawn(serve(listener, state, shutdown));

    tracing::info!(%local_addr, "Deli counter server spawned on background task");

    Ok(RunningServer { local_addr, handle })
}

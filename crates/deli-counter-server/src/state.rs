//! Shared application state for the broadcast server.
//!
//! [`AppState`] is wrapped in [`Arc`] and injected into every handler via
//! Axum's `State` extractor. It carries the [`Broadcaster`] plus the few
//! settings the handlers need at request time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use deli_counter_core::{CounterStore, DeliCounterConfig};

use crate::broadcast::Broadcaster;

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Counter mutation and viewer fan-out.
    pub broadcaster: Arc<Broadcaster>,
    /// Interval between server pings on each viewer socket.
    pub heartbeat_interval: Option<Duration>,
    /// Whether the `POST` control endpoints accept requests.
    pub control_http: bool,
    /// Wall-clock time the server state was created.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state over `store` with heartbeats disabled and HTTP control
    /// enabled.
    pub fn new(store: Arc<CounterStore>) -> Self {
        Self {
            broadcaster: Arc::new(Broadcaster::new(store)),
            heartbeat_interval: None,
            control_http: true,
            started_at: Utc::now(),
        }
    }

    /// Create state over `store` using the viewer and control sections of
    /// `config`.
    pub fn from_config(config: &DeliCounterConfig, store: Arc<CounterStore>) -> Self {
        let secs = config.viewer.heartbeat_interval_secs;
        Self {
            heartbeat_interval: (secs > 0).then(|| Duration::from_secs(secs)),
            control_http: config.control.http,
            ..Self::new(store)
        }
    }

    /// Seconds elapsed since the state was created.
    pub fn uptime_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }
}

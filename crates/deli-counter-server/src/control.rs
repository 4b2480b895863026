//! Control REST handlers for the counter.
//!
//! These endpoints replace the "Next" / "Previous" buttons of a desktop
//! control panel. Each mutation goes through the [`Broadcaster`], so every
//! connected viewer sees the new value.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/counter` | Current value and viewer count |
//! | `POST` | `/api/counter/advance` | Serve the next customer |
//! | `POST` | `/api/counter/retreat` | Step back one customer |
//!
//! [`Broadcaster`]: crate::broadcast::Broadcaster

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::info;

use crate::broadcast::Delivery;
use crate::error::ApiError;
use crate::state::AppState;

/// Response body for `GET /api/counter`.
#[derive(Debug, serde::Serialize)]
pub struct CounterStatus {
    /// The current counter value.
    pub value: i64,
    /// Number of connected viewers.
    pub viewers: usize,
    /// ISO 8601 timestamp of server start.
    pub started_at: String,
    /// Seconds since server start.
    pub uptime_seconds: u64,
}

// ---------------------------------------------------------------------------
// GET /api/counter
// ---------------------------------------------------------------------------

/// Report the current value without modifying it.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(CounterStatus {
        value: state.broadcaster.current_value(),
        viewers: state.broadcaster.viewer_count(),
        started_at: state.started_at.to_rfc3339(),
        uptime_seconds: state.uptime_seconds(),
    })
}

// ---------------------------------------------------------------------------
// POST /api/counter/advance
// ---------------------------------------------------------------------------

/// Increment the counter and broadcast the new value.
pub async fn advance(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Delivery>, ApiError> {
    ensure_enabled(&state)?;
    let delivery = state.broadcaster.advance().await;
    info!(value = delivery.value, delivered = delivery.delivered, "counter advanced");
    Ok(Json(delivery))
}

// ---------------------------------------------------------------------------
// POST /api/counter/retreat
// ---------------------------------------------------------------------------

/// Decrement the counter and broadcast the new value.
pub async fn retreat(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Delivery>, ApiError> {
    ensure_enabled(&state)?;
    let delivery = state.broadcaster.retreat().await;
    info!(value = delivery.value, delivered = delivery.delivered, "counter retreated");
    Ok(Json(delivery))
}

fn ensure_enabled(state: &AppState) -> Result<(), ApiError> {
    if state.control_http {
        Ok(())
    } else {
        Err(ApiError::ControlDisabled(
            "HTTP control is disabled by configuration".to_owned(),
        ))
    }
}

//! Axum router construction for the broadcast server.
//!
//! Assembles the viewer page, the viewer socket, and the control API into
//! a single [`Router`] with CORS and request tracing enabled.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ws::SOCKET_PATH;
use crate::{control, handlers, ws};

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- viewer page
/// - `GET /deli-counter-socket` -- viewer `WebSocket`
/// - `GET /api/counter` -- current value and viewer count
/// - `POST /api/counter/advance` -- increment and broadcast
/// - `POST /api/counter/retreat` -- decrement and broadcast
///
/// CORS allows any origin so a control panel can be hosted elsewhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Viewer page
        .route("/", get(handlers::index))
        // WebSocket
        .route(SOCKET_PATH, get(ws::ws_counter))
        // Control API
        .route("/api/counter", get(control::status))
        .route("/api/counter/advance", post(control::advance))
        .route("/api/counter/retreat", post(control::retreat))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

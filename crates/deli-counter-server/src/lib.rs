//! Real-time broadcast server for the Deli Counter.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/deli-counter-socket`) pushing the counter
//!   as plain decimal text: once on connect, then once per mutation
//! - **Viewer page** (`GET /`) whose script renders every pushed value
//! - **Control endpoints** (`/api/counter/...`) to advance or retreat the
//!   counter and read its status
//!
//! # Architecture
//!
//! The [`Broadcaster`] sits between the [`CounterStore`] and the
//! [`ConnectionRegistry`]. Each viewer socket gets its own task and an
//! unbounded outbound queue; a broadcast only enqueues, so a slow viewer
//! never stalls a control action. Mutation plus fan-out, and registration
//! plus the welcome message, are serialized so every viewer sees values in
//! the order they were produced, starting from the value current when it
//! joined.
//!
//! [`Broadcaster`]: broadcast::Broadcaster
//! [`ConnectionRegistry`]: registry::ConnectionRegistry
//! [`CounterStore`]: deli_counter_core::CounterStore

pub mod broadcast;
pub mod control;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use broadcast::{Broadcaster, Delivery};
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, serve, start_server};
pub use startup::{RunningServer, StartupError, spawn_server};
pub use state::AppState;

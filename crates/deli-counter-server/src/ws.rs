//! `WebSocket` handler for viewer connections.
//!
//! Viewers connect to `GET /deli-counter-socket` and receive the counter
//! as plain decimal text frames: once on connect, then once per mutation.
//! Inbound frames are read only to notice that the viewer has gone away;
//! their content is ignored.
//!
//! Each connection runs as a single task that moves through
//! [`ConnectionPhase`]s:
//!
//! ```text
//! Connecting -> Open -> Closing -> Closed
//! ```
//!
//! `Open` is entered once the connection is registered and its welcome
//! value queued. A close frame, end of stream, socket error, or failed
//! write moves it to `Closing`; the task then stops draining its queue and
//! unregisters exactly once on `Closed`.
//!
//! With heartbeats on, the task pings the viewer every period and expects a
//! `Pong` back. A viewer silent for [`MISSED_HEARTBEATS`] periods, or a
//! write that stalls that long, is treated as gone.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use chrono::Utc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::debug;

use crate::registry::{ConnectionHandle, ConnectionId};
use crate::state::AppState;

/// Route path of the viewer socket.
pub const SOCKET_PATH: &str = "/deli-counter-socket";

/// Heartbeat periods a viewer may go without answering a ping.
pub const MISSED_HEARTBEATS: u32 = 2;

/// Lifecycle phase of one viewer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Upgrade complete, not yet registered.
    Connecting,
    /// Registered and synchronized; receiving broadcasts.
    Open,
    /// Transport reported closure; no further sends.
    Closing,
    /// Unregistered.
    Closed,
}

/// Why a connection left the `Open` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// Viewer sent a close frame or the stream ended.
    PeerClosed,
    /// Reading from the socket failed.
    ReadError,
    /// Writing a broadcast or heartbeat failed.
    WriteFailed,
    /// The outbound queue was dropped.
    QueueClosed,
    /// No `Pong` arrived within the allowed heartbeat periods.
    HeartbeatTimeout,
}

/// Upgrade an HTTP request to a viewer `WebSocket`.
///
/// # Route
///
/// `GET /deli-counter-socket`
pub async fn ws_counter(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Drive one viewer connection from registration to unregistration.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let (handle, mut rx) = ConnectionHandle::channel();
    let handle = Arc::new(handle);
    let id = handle.id();
    let mut phase = ConnectionPhase::Connecting;
    debug!(conn_id = %id, ?phase, "viewer connected");

    let value = state.broadcaster.connect(Arc::clone(&handle)).await;
    phase = enter(id, phase, ConnectionPhase::Open);
    debug!(conn_id = %id, value, "viewer synchronized");

    let mut heartbeat = state.heartbeat_interval.map(heartbeat_interval);
    let deadline = state
        .heartbeat_interval
        .map(|period| period.saturating_mul(MISSED_HEARTBEATS));
    let mut last_pong = Instant::now();

    let reason = loop {
        tokio::select! {
            // Queued counter values, oldest first.
            queued = rx.recv() => {
                let Some(text) = queued else {
                    break CloseReason::QueueClosed;
                };
                if let Err(reason) = send_frame(&mut socket, Message::Text(text.into()), deadline).await {
                    break reason;
                }
            }
            () = next_heartbeat(heartbeat.as_mut()) => {
                if deadline.is_some_and(|limit| last_pong.elapsed() > limit) {
                    break CloseReason::HeartbeatTimeout;
                }
                if let Err(reason) = send_frame(&mut socket, Message::Ping(Bytes::new()), deadline).await {
                    break reason;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break CloseReason::PeerClosed,
                    Some(Err(e)) => {
                        debug!(conn_id = %id, "viewer socket error: {e}");
                        break CloseReason::ReadError;
                    }
                    Some(Ok(Message::Pong(_))) => last_pong = Instant::now(),
                    // Viewers are read-only; tungstenite answers pings itself.
                    Some(Ok(_)) => {}
                }
            }
        }
    };

    phase = enter(id, phase, ConnectionPhase::Closing);
    let open_secs = Utc::now()
        .signed_duration_since(handle.connected_at())
        .num_seconds();
    debug!(conn_id = %id, ?reason, open_secs, "viewer closing");
    // Dropping the receiver marks the handle closed so in-flight
    // broadcasts skip it.
    drop(rx);
    drop(socket);

    state.broadcaster.disconnect(id).await;
    enter(id, phase, ConnectionPhase::Closed);
}

/// Record a phase transition.
fn enter(id: ConnectionId, from: ConnectionPhase, to: ConnectionPhase) -> ConnectionPhase {
    debug!(conn_id = %id, ?from, ?to, "viewer phase");
    to
}

/// Write one frame, giving up after `limit` when heartbeats are on.
async fn send_frame(
    socket: &mut WebSocket,
    msg: Message,
    limit: Option<Duration>,
) -> Result<(), CloseReason> {
    let sent = match limit {
        Some(limit) => tokio::time::timeout(limit, socket.send(msg))
            .await
            .map_err(|_| CloseReason::HeartbeatTimeout)?,
        None => socket.send(msg).await,
    };
    sent.map_err(|_| CloseReason::WriteFailed)
}

fn heartbeat_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the immediate first tick.
    interval.reset();
    interval
}

/// Resolve on the next heartbeat tick, or never when heartbeats are off.
async fn next_heartbeat(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

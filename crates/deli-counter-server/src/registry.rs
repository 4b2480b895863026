//! Live set of open viewer connections.
//!
//! Each viewer socket is represented by a [`ConnectionHandle`]: an identity
//! plus the sending half of the connection's outbound queue. The socket
//! itself is owned by the connection task in [`crate::ws`]; the registry
//! only holds what it needs to enqueue messages and to notice that the
//! task has gone away.
//!
//! [`ConnectionRegistry`] guards the set with an async [`RwLock`].
//! Broadcasts iterate over a snapshot taken under the read lock, so a
//! concurrent connect or disconnect can never expose a half-updated set.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Unique identifier for one viewer connection.
///
/// Uses UUID v7 so identifiers sort by connection time in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry-side view of one open viewer socket.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    connected_at: DateTime<Utc>,
    tx: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    /// Wrap the sending half of a connection's outbound queue.
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id: ConnectionId::new(),
            connected_at: Utc::now(),
            tx,
        }
    }

    /// Create a handle together with the receiver the connection task
    /// drains into its socket.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// The connection's identity.
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// When the connection was accepted.
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Queue a text message for delivery.
    ///
    /// Returns `false` if the connection task has already stopped reading
    /// its queue. Messages are delivered in the order they are queued.
    pub fn send(&self, text: String) -> bool {
        self.tx.send(text).is_ok()
    }

    /// Whether the connection task has dropped its end of the queue.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The active set of viewer connections.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<ConnectionHandle>>>,
    /// Tracks membership size so counting never takes the lock.
    active_count: AtomicUsize,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to the active set.
    ///
    /// Returns `true` if the connection was not already registered.
    pub async fn register(&self, handle: Arc<ConnectionHandle>) -> bool {
        let mut conns = self.connections.write().await;
        let inserted = conns.insert(handle.id(), handle).is_none();
        if inserted {
            self.active_count.fetch_add(1, Ordering::AcqRel);
        }
        inserted
    }

    /// Remove a connection from the active set.
    ///
    /// Idempotent: returns `false` and changes nothing when the
    /// connection is already absent.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut conns = self.connections.write().await;
        let removed = conns.remove(&id).is_some();
        if removed {
            self.active_count.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }

    /// Apply `f` to every connection in a snapshot of the active set.
    ///
    /// The snapshot is taken under the read lock and released before `f`
    /// runs. Connections whose queue has closed since the snapshot are
    /// skipped. Returns how many connections `f` was applied to.
    pub async fn for_each_active<F>(&self, mut f: F) -> usize
    where
        F: FnMut(&ConnectionHandle),
    {
        let snapshot: Vec<Arc<ConnectionHandle>> =
            self.connections.read().await.values().cloned().collect();

        let mut visited = 0usize;
        for handle in snapshot.iter().filter(|h| !h.is_closed()) {
            f(handle);
            visited = visited.saturating_add(1);
        }
        visited
    }

    /// Whether `id` is currently registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.active_count.load(Ordering::Acquire)
    }

    /// Whether no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

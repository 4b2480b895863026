//! Bridges counter mutations to viewer fan-out.
//!
//! [`Broadcaster`] owns the [`CounterStore`] handle and the
//! [`ConnectionRegistry`]. Every mutation and every registration goes
//! through one async mutex, the publish lock:
//!
//! - `advance` / `retreat` mutate the store and enqueue the new value on
//!   every active connection while holding it, so each connection sees
//!   values in the order they were produced.
//! - `connect` registers the connection, reads the current value, and
//!   enqueues it as the first message while holding it, so a new viewer
//!   never misses a mutation and never receives a delta before its
//!   welcome value.
//!
//! Fan-out only pushes onto unbounded per-connection queues, so holding the
//! lock never waits on a slow socket.

use std::sync::Arc;

use deli_counter_core::{CounterStore, encode_value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};

/// Outcome of one control action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Delivery {
    /// The counter value after the mutation.
    pub value: i64,
    /// Number of connections the value was queued for.
    pub delivered: usize,
}

/// Counter mutation and fan-out coordinator.
#[derive(Debug)]
pub struct Broadcaster {
    store: Arc<CounterStore>,
    registry: ConnectionRegistry,
    publish: Mutex<()>,
}

impl Broadcaster {
    /// Create a broadcaster over `store` with an empty registry.
    pub fn new(store: Arc<CounterStore>) -> Self {
        Self {
            store,
            registry: ConnectionRegistry::new(),
            publish: Mutex::new(()),
        }
    }

    /// Register a viewer connection and queue the current value as its
    /// first message.
    ///
    /// Returns the value the viewer was synchronized with.
    pub async fn connect(&self, handle: Arc<ConnectionHandle>) -> i64 {
        let _guard = self.publish.lock().await;
        let id = handle.id();
        self.registry.register(Arc::clone(&handle)).await;
        let value = self.store.current_value();
        if !handle.send(encode_value(value)) {
            debug!(conn_id = %id, "viewer closed before welcome value was queued");
        }
        debug!(conn_id = %id, value, viewers = self.registry.len(), "viewer registered");
        value
    }

    /// Remove a viewer connection.
    ///
    /// Safe to call more than once; returns `true` only for the call that
    /// actually removed it.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.registry.unregister(id).await;
        if removed {
            debug!(conn_id = %id, viewers = self.registry.len(), "viewer unregistered");
        }
        removed
    }

    /// Increment the counter and broadcast the new value.
    pub async fn advance(&self) -> Delivery {
        let _guard = self.publish.lock().await;
        let value = self.store.increment();
        self.fan_out(value).await
    }

    /// Decrement the counter and broadcast the new value.
    pub async fn retreat(&self) -> Delivery {
        let _guard = self.publish.lock().await;
        let value = self.store.decrement();
        self.fan_out(value).await
    }

    /// The current counter value.
    pub fn current_value(&self) -> i64 {
        self.store.current_value()
    }

    /// Number of registered viewers.
    pub fn viewer_count(&self) -> usize {
        self.registry.len()
    }

    /// Queue `value` on every active connection. Caller holds the publish
    /// lock.
    async fn fan_out(&self, value: i64) -> Delivery {
        let text = encode_value(value);
        let mut delivered = 0usize;
        let attempted = self
            .registry
            .for_each_active(|conn| {
                if conn.send(text.clone()) {
                    delivered = delivered.saturating_add(1);
                } else {
                    debug!(conn_id = %conn.id(), value, "skipping closed viewer");
                }
            })
            .await;

        debug!(value, attempted, delivered, "broadcast counter value");
        Delivery { value, delivered }
    }
}

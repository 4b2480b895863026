//! The authoritative "now serving" counter.
//!
//! [`CounterStore`] holds a single signed integer behind an [`AtomicI64`].
//! Every read and write goes through the store, so there is exactly one
//! value at any instant. Increments and decrements are single atomic
//! read-modify-write operations and never lose updates under contention.
//!
//! The store does not broadcast. Callers that mutate the counter are
//! responsible for pushing the returned value to viewers.
//!
//! # Overflow
//!
//! Arithmetic wraps at the `i64` limits, matching the semantics of
//! [`AtomicI64::fetch_add`]. A deli queue never gets there; the boundary is
//! documented rather than handled.

use std::sync::atomic::{AtomicI64, Ordering};

/// Process-wide integer counter with linearizable increment, decrement,
/// and read.
///
/// Shared between tasks behind an [`Arc`](std::sync::Arc). No caller-side
/// locking is needed.
#[derive(Debug, Default)]
pub struct CounterStore {
    value: AtomicI64,
}

impl CounterStore {
    /// Create a counter starting at zero.
    pub const fn new() -> Self {
        Self::with_initial(0)
    }

    /// Create a counter starting at `initial`.
    pub const fn with_initial(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
        }
    }

    /// Add one and return the new value.
    pub fn increment(&self) -> i64 {
        self.value.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    /// Subtract one and return the new value.
    ///
    /// There is no floor: decrementing past zero yields negative values.
    pub fn decrement(&self) -> i64 {
        self.value.fetch_sub(1, Ordering::AcqRel).wrapping_sub(1)
    }

    /// Read the current value without modifying it.
    pub fn current_value(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }
}

/// Encode a counter value for the viewer socket.
///
/// The wire format is the plain decimal text of the integer with no
/// envelope: `"42"`, `"-1"`.
pub fn encode_value(value: i64) -> String {
    value.to_string()
}

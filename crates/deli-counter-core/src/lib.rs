//! Counter state and configuration for the Deli Counter broadcast service.
//!
//! This crate owns the single authoritative "now serving" number and the
//! typed configuration shared by the server and the binary.
//!
//! # Modules
//!
//! - [`counter`] -- [`CounterStore`], the lock-free integer counter, and
//!   the plain decimal wire encoding pushed to viewers.
//! - [`config`] -- Configuration loading from `deli-counter.yaml` into
//!   strongly-typed structs.
//!
//! [`CounterStore`]: counter::CounterStore

pub mod config;
pub mod counter;

pub use config::{ConfigError, DeliCounterConfig};
pub use counter::{CounterStore, encode_value};

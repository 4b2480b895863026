//! Error types for the Deli Counter binary.
//!
//! [`AppError`] is the top-level error that wraps all possible failure
//! modes during start-up and shutdown.

/// Top-level error for the Deli Counter binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: deli_counter_core::ConfigError,
    },

    /// The Tokio runtime could not be built.
    #[error("runtime error: {source}")]
    Runtime {
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Logging could not be initialized.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the logging failure.
        message: String,
    },

    /// The server failed to start.
    #[error("startup error: {source}")]
    Startup {
        /// The underlying startup error.
        #[from]
        source: deli_counter_server::StartupError,
    },

    /// The server stopped with an error.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: deli_counter_server::ServerError,
    },

    /// The server task panicked or was cancelled.
    #[error("server task failed: {message}")]
    ServerTask {
        /// Description of the join failure.
        message: String,
    },
}

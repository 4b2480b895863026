//! Deli Counter binary.
//!
//! Wires the counter store, the broadcast server, and the terminal
//! control console together, then runs until `Ctrl-C` or a console
//! `quit`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `deli-counter.yaml` (or `DELI_COUNTER_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Create the counter store at the configured initial value
//! 4. Bind the listener and spawn the server
//! 5. Start the control console on standard input (if enabled)
//! 6. Wait for the server to shut down

mod console;
mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use deli_counter_core::{CounterStore, DeliCounterConfig};
use deli_counter_server::{AppState, ServerConfig, spawn_server};
use tokio::io::BufReader;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::console::{ConsoleExit, run_console};
use crate::error::AppError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "deli-counter.yaml";

/// Environment variable naming an alternative configuration file.
const CONFIG_PATH_ENV: &str = "DELI_COUNTER_CONFIG";

/// How long shutdown waits for blocking work such as a pending stdin read.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Application entry point.
///
/// The runtime is built by hand so shutdown can abandon the console's
/// blocking stdin read instead of waiting for one more line.
///
/// # Errors
///
/// Returns an error if configuration, logging, or binding the listener
/// fails, or if the server stops with an error.
fn main() -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| AppError::Runtime { source })?;

    let result = runtime.block_on(run());
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

/// Run the service until shutdown.
async fn run() -> Result<(), AppError> {
    // 1. Load configuration.
    let (config, config_source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config)?;
    info!(source = %config_source, "deli-counter starting");
    info!(
        host = config.server.host,
        port = config.server.port,
        initial_value = config.counter.initial_value,
        heartbeat_interval_secs = config.viewer.heartbeat_interval_secs,
        control_http = config.control.http,
        control_console = config.control.console,
        "Configuration loaded"
    );

    // 3. Create the counter store.
    let store = Arc::new(CounterStore::with_initial(config.counter.initial_value));
    let state = Arc::new(AppState::from_config(&config, store));

    // 4. Spawn the server.
    let quit = Arc::new(Notify::new());
    let running = spawn_server(
        &ServerConfig::from(&config.server),
        Arc::clone(&state),
        shutdown_signal(Arc::clone(&quit)),
    )
    .await?;
    info!(addr = %running.local_addr, "Viewers can open http://{}/", running.local_addr);

    // 5. Start the control console.
    if config.control.console {
        let broadcaster = Arc::clone(&state.broadcaster);
        let quit = Arc::clone(&quit);
        tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            match run_console(stdin, broadcaster).await {
                ConsoleExit::Quit => {
                    info!("Quit requested from console");
                    quit.notify_one();
                }
                ConsoleExit::EndOfInput => {
                    info!("Console input closed, server keeps running");
                }
            }
        });
    }

    // 6. Wait for shutdown.
    running
        .handle
        .await
        .map_err(|e| AppError::ServerTask {
            message: format!("{e}"),
        })??;

    info!(
        final_value = state.broadcaster.current_value(),
        "deli-counter shutdown complete"
    );
    Ok(())
}

/// Load configuration from the configured path, falling back to defaults
/// (plus environment overrides) when the file does not exist.
///
/// Returns the config and a description of where it came from.
fn load_config() -> Result<(DeliCounterConfig, String), AppError> {
    let path = std::env::var(CONFIG_PATH_ENV)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        let config = DeliCounterConfig::from_file(&path)?;
        Ok((config, path.display().to_string()))
    } else {
        let mut config = DeliCounterConfig::default();
        config.apply_env_overrides()?;
        Ok((config, String::from("defaults")))
    }
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set.
fn init_logging(config: &DeliCounterConfig) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .map_err(|e| AppError::Logging {
            message: format!("invalid log filter {:?}: {e}", config.logging.level),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| AppError::Logging {
        message: format!("{e}"),
    })
}

/// Resolve on `Ctrl-C` or when `quit` is notified.
async fn shutdown_signal(quit: Arc<Notify>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to listen for Ctrl-C");
                // Without a signal handler only the console can stop us.
                quit.notified().await;
            } else {
                info!("Ctrl-C received, shutting down");
            }
        }
        () = quit.notified() => {}
    }
}

//! Configuration loading and typed config structures for the Deli Counter.
//!
//! The configuration lives in `deli-counter.yaml` next to the binary's
//! working directory. Every section and field has a default, so an empty
//! file (or no file at all) yields a server on `0.0.0.0:8080` with the
//! counter at zero.
//!
//! ```yaml
//! server:
//!   host: "0.0.0.0"
//!   port: 8080
//! counter:
//!   initial_value: 0
//! viewer:
//!   heartbeat_interval_secs: 30
//! control:
//!   http: true
//!   console: true
//! logging:
//!   level: "info"
//!   json: false
//! ```

use std::path::Path;

use serde::Deserialize;

/// Environment variable overriding [`ServerSection::host`].
pub const ENV_HOST: &str = "DELI_COUNTER_HOST";

/// Environment variable overriding [`ServerSection::port`].
pub const ENV_PORT: &str = "DELI_COUNTER_PORT";

/// Environment variable overriding [`LoggingConfig::level`].
pub const ENV_LOG_LEVEL: &str = "DELI_COUNTER_LOG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held a value that could not be used.
    #[error("invalid value for {name}: {value:?}")]
    InvalidOverride {
        /// Name of the environment variable.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `deli-counter.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeliCounterConfig {
    /// Listener address.
    #[serde(default)]
    pub server: ServerSection,

    /// Counter start-up settings.
    #[serde(default)]
    pub counter: CounterConfig,

    /// Viewer socket settings.
    #[serde(default)]
    pub viewer: ViewerConfig,

    /// Which control surfaces are enabled.
    #[serde(default)]
    pub control: ControlConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DeliCounterConfig {
    /// Load configuration from a YAML file and apply environment overrides.
    ///
    /// Environment variables take precedence over file values:
    /// - `DELI_COUNTER_HOST` overrides `server.host`
    /// - `DELI_COUNTER_PORT` overrides `server.port`
    /// - `DELI_COUNTER_LOG` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] if an override is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// Does not consult the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if `DELI_COUNTER_PORT` is
    /// not a valid port number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides using `lookup` to resolve variable names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if the port override is
    /// not a valid `u16`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port.trim().parse().map_err(|_parse_err| {
                ConfigError::InvalidOverride {
                    name: ENV_PORT,
                    value: port.clone(),
                }
            })?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        Ok(())
    }
}

/// Listener address configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Host address to bind to. `0.0.0.0` binds every interface.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Counter start-up configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CounterConfig {
    /// Value the counter holds when the process starts.
    #[serde(default)]
    pub initial_value: i64,
}

/// Viewer socket configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewerConfig {
    /// Seconds between server pings on an idle viewer socket (0 disables).
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

/// Control surface toggles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControlConfig {
    /// Mount `POST /api/counter/advance` and `POST /api/counter/retreat`.
    #[serde(default = "default_true")]
    pub http: bool,

    /// Read control commands from standard input.
    #[serde(default = "default_true")]
    pub console: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            http: true,
            console: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

const fn default_heartbeat_interval_secs() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    String::from("info")
}

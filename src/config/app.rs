//! Application configuration structures.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default connect timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default whole-request timeout (10 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of fetch workers.
pub const DEFAULT_WORKERS: usize = 10;

/// Default request queue capacity.
///
/// One slot is the closest tokio gets to a rendezvous hand-off: a tick waits
/// until a worker has taken the previous request.
pub const DEFAULT_REQUEST_CAPACITY: usize = 1;

/// Default result queue capacity.
pub const DEFAULT_RESULT_CAPACITY: usize = 1024;

/// Default Kestrel delivery timeout (2 seconds).
pub const DEFAULT_KESTREL_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Server Configuration
// =============================================================================

/// Control server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 9001).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 9001,
        }
    }
}

// =============================================================================
// Fetch Configuration
// =============================================================================

/// Fetch worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Bound on the transport handshake (default: 5s).
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Bound on the whole round trip including the body (default: 10s).
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Number of fetch workers (default: 10).
    pub workers: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            workers: DEFAULT_WORKERS,
        }
    }
}

// =============================================================================
// Queue Configuration
// =============================================================================

/// Capacities of the hand-off queues between pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Probe to worker queue (default: 1).
    pub request_capacity: usize,

    /// Worker to collector queue (default: 1024).
    pub result_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            request_capacity: DEFAULT_REQUEST_CAPACITY,
            result_capacity: DEFAULT_RESULT_CAPACITY,
        }
    }
}

// =============================================================================
// Receiver Configuration
// =============================================================================

/// Kestrel receiver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KestrelConfig {
    /// Register the receiver (default: false).
    pub enabled: bool,

    /// Kestrel `host:port` address (default: "localhost:22133").
    pub host: String,

    /// Queue name results are pushed under (default: "stats").
    pub queue: String,

    /// Bound on one delivery, connect included (default: 2s).
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for KestrelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost:22133".to_string(),
            queue: "stats".to_string(),
            timeout: DEFAULT_KESTREL_TIMEOUT,
        }
    }
}

/// Result receivers, registered in field order: log, then Kestrel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiversConfig {
    /// Register the log receiver (default: false).
    pub log: bool,

    /// Kestrel queue receiver.
    pub kestrel: KestrelConfig,
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Control server configuration.
    pub server: ServerConfig,

    /// Fetch worker pool configuration.
    pub fetch: FetchConfig,

    /// Queue capacities.
    pub queues: QueueConfig,

    /// Result receivers.
    pub receivers: ReceiversConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded before parsing.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        Self::from_yaml(&content)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(&expand_env_vars(content))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server bind address
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        if self.fetch.workers == 0 {
            return Err(ConfigError::ValidationError(
                "fetch workers must be positive".to_string(),
            ));
        }

        if self.fetch.connect_timeout.is_zero() || self.fetch.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "fetch timeouts must be non-zero".to_string(),
            ));
        }

        // tokio channels cannot be created with zero capacity
        if self.queues.request_capacity == 0 || self.queues.result_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "queue capacities must be positive".to_string(),
            ));
        }

        let kestrel = &self.receivers.kestrel;
        if kestrel.enabled {
            if kestrel.host.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "kestrel host is required when kestrel is enabled".to_string(),
                ));
            }
            if kestrel.queue.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "kestrel queue is required when kestrel is enabled".to_string(),
                ));
            }
            if kestrel.timeout.is_zero() {
                return Err(ConfigError::ValidationError(
                    "kestrel timeout must be non-zero".to_string(),
                ));
            }
        }

        Ok(())
    }
}

//! Configuration module for piezo.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (bind address, port)
//! - Fetch settings (connect/request timeouts, worker count)
//! - Queue capacities between pipeline stages
//! - Receiver settings (log, Kestrel)

mod app;
mod validation;

pub use app::{
    AppConfig, FetchConfig, KestrelConfig, QueueConfig, ReceiversConfig, ServerConfig,
};
pub use validation::{ConfigError, expand_env_vars};

// Re-export constants
pub use app::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_CAPACITY, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_RESULT_CAPACITY, DEFAULT_WORKERS,
};

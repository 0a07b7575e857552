//! Configuration errors and environment expansion.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file at `path`.
    #[error("failed to read config file '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

impl ConfigError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}

/// Pattern for `${VAR}` and `${VAR:-default}` references.
const ENV_REF_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}";

/// Substitute `${VAR}` / `${VAR:-default}` references in raw config text.
///
/// Unset variables without a default expand to an empty string; YAML
/// validation then reports the empty field.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_REF: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let pattern = ENV_REF
        .get_or_init(|| regex::Regex::new(ENV_REF_PATTERN).expect("invalid env reference pattern"));

    pattern
        .replace_all(input, |caps: &regex::Captures| {
            let fallback = caps.get(2).map_or("", |m| m.as_str());
            std::env::var(&caps[1]).unwrap_or_else(|_| fallback.to_owned())
        })
        .into_owned()
}

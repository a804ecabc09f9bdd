//! Config loading errors.

/// Failure modes while loading or merging configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that was attempted.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The file's contents were not valid TOML.
    #[error("failed to parse {path} as TOML: {source}")]
    Toml {
        /// Path that was attempted.
        path: String,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
    /// An environment variable override had a value of the wrong type.
    #[error("env var {name} has an invalid value {value:?}: {reason}")]
    InvalidEnvValue {
        /// Variable name, e.g. `CORTEX_POOL_MAX_SIZE`.
        name: String,
        /// Raw value that failed to parse.
        value: String,
        /// Human-readable parse failure.
        reason: String,
    },
    /// Anything not covered above.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ConfigError {
    /// Config errors are caller/operator mistakes, never retried by the breaker.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

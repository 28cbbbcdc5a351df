//! Configuration error types
//!
//! Every configuration problem is detected when the process starts; request
//! handling never sees a `ConfigError`.

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO-related errors (file access, permissions, etc.)
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required endpoint key is absent or blank
    #[error("Missing required config key '{key}' for endpoint '{endpoint}'")]
    MissingKey { endpoint: String, key: String },

    /// An endpoint entry is present but malformed
    #[error("Invalid endpoint '{name}': {reason}")]
    InvalidEndpoint { name: String, reason: String },

    /// Two sources define the same endpoint name
    #[error("Endpoint '{0}' is defined more than once")]
    DuplicateEndpoint(String),

    /// Configuration validation errors
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

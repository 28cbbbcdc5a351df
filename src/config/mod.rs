//! Configuration module for Conflagent
//!
//! The server reads one TOML file at startup. Endpoints may be declared inline
//! as `[endpoints.<name>]` tables or picked up from a directory of legacy
//! `conflagent.<name>.properties` files. Everything is validated before the
//! HTTP server binds; nothing is reloaded afterwards.

pub mod error;

pub use error::ConfigError;

use crate::endpoint::{properties, Endpoint, EndpointRegistry};
use crate::logging::config::LogConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "CONFLAGENT_CONFIG";
/// Configuration file used when neither a flag nor the environment names one
pub const DEFAULT_CONFIG_PATH: &str = "conflagent.toml";
/// Largest accepted `transport.max_read_retries`
pub const MAX_READ_RETRIES: u32 = 10;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory scanned for `conflagent.<name>.properties` files
    #[serde(default)]
    pub endpoints_dir: Option<PathBuf>,
    #[serde(default)]
    pub server: HttpConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub logging: LogConfig,
    /// Inline endpoint tables keyed by endpoint name
    #[serde(default)]
    pub endpoints: BTreeMap<String, Endpoint>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Outbound call settings for the Confluence transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Extra attempts for idempotent reads. Writes are never retried.
    #[serde(default = "default_max_read_retries")]
    pub max_read_retries: u32,
    /// Base delay of the exponential read backoff
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Bounds for tree listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Depth used when a request does not give one
    #[serde(default = "default_tree_depth")]
    pub default_depth: u32,
    /// Largest depth a request may ask for
    #[serde(default = "default_max_tree_depth")]
    pub max_depth: u32,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_read_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_tree_depth() -> u32 {
    2
}

fn default_max_tree_depth() -> u32 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            max_read_retries: default_max_read_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            default_depth: default_tree_depth(),
            max_depth: default_max_tree_depth(),
        }
    }
}

impl ServerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: ServerConfig = toml::from_str(content)?;
        for (name, endpoint) in config.endpoints.iter_mut() {
            endpoint.name = name.clone();
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate scalar settings. Endpoints are validated by [`Self::build_registry`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "transport.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.transport.max_read_retries > MAX_READ_RETRIES {
            return Err(ConfigError::Validation(format!(
                "transport.max_read_retries ({}) exceeds {}",
                self.transport.max_read_retries, MAX_READ_RETRIES
            )));
        }
        if self.tree.default_depth > self.tree.max_depth {
            return Err(ConfigError::Validation(format!(
                "tree.default_depth ({}) exceeds tree.max_depth ({})",
                self.tree.default_depth, self.tree.max_depth
            )));
        }
        self.logging.validate()?;
        Ok(())
    }

    /// Bind address in `host:port` form.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    /// Collect inline and directory endpoints into a validated registry.
    ///
    /// A relative `endpoints_dir` is resolved against `base_dir`, normally the
    /// directory holding the configuration file.
    pub fn build_registry(&self, base_dir: &Path) -> Result<EndpointRegistry, ConfigError> {
        let mut endpoints: Vec<Endpoint> = self.endpoints.values().cloned().collect();

        if let Some(dir) = &self.endpoints_dir {
            let dir = if dir.is_absolute() {
                dir.clone()
            } else {
                base_dir.join(dir)
            };
            endpoints.extend(properties::load_properties_dir(&dir)?);
        }

        EndpointRegistry::new(endpoints)
    }
}

/// Load the server configuration from the given path, the `CONFLAGENT_CONFIG`
/// environment variable, or `conflagent.toml`.
///
/// A missing file yields the default configuration; a present but invalid file
/// is an error.
pub fn load_server_config(path: Option<&str>) -> Result<(ServerConfig, PathBuf), ConfigError> {
    let config_path = PathBuf::from(
        path.map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
    );
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    if !config_path.exists() {
        log::warn!(
            "Configuration file {} not found, using defaults",
            config_path.display()
        );
        return Ok((ServerConfig::default(), base_dir));
    }

    let content = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
        path: config_path.display().to_string(),
        source: e,
    })?;
    let config = ServerConfig::from_toml_str(&content)?;
    Ok((config, base_dir))
}

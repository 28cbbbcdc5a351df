//! Configuration for the logging system
//!
//! Read from the `[logging]` section of the server configuration. `RUST_LOG`,
//! when set, takes precedence over the configured levels.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const LEVELS: [&str; 6] = ["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default log level for all modules
    #[serde(default = "default_level")]
    pub default_level: String,
    /// Per-module overrides, e.g. `actix_web = "WARN"`
    #[serde(default)]
    pub module_levels: BTreeMap<String, String>,
    /// Include timestamps in console output
    #[serde(default = "default_true")]
    pub include_timestamp: bool,
    /// Include the module path in console output
    #[serde(default = "default_true")]
    pub include_module: bool,
}

fn default_level() -> String {
    "INFO".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: default_level(),
            module_levels: BTreeMap::new(),
            include_timestamp: true,
            include_module: true,
        }
    }
}

/// Parse a level name, case-insensitively.
pub fn parse_level(level: &str) -> Option<log::LevelFilter> {
    match level.to_ascii_uppercase().as_str() {
        "OFF" => Some(log::LevelFilter::Off),
        "ERROR" => Some(log::LevelFilter::Error),
        "WARN" => Some(log::LevelFilter::Warn),
        "INFO" => Some(log::LevelFilter::Info),
        "DEBUG" => Some(log::LevelFilter::Debug),
        "TRACE" => Some(log::LevelFilter::Trace),
        _ => None,
    }
}

impl LogConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let levels = std::iter::once(("default_level", &self.default_level))
            .chain(self.module_levels.iter().map(|(m, l)| (m.as_str(), l)));
        for (scope, level) in levels {
            if parse_level(level).is_none() {
                return Err(ConfigError::Validation(format!(
                    "Invalid log level '{}' for {}; expected one of {}",
                    level,
                    scope,
                    LEVELS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Global level filter.
    pub fn level_filter(&self) -> log::LevelFilter {
        parse_level(&self.default_level).unwrap_or(log::LevelFilter::Info)
    }
}

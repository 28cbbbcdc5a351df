//! # Logging
//!
//! Console logging through the `log` facade with an `env_logger` backend.

pub mod config;

use config::{parse_level, LogConfig};
use std::io::Write;

/// Logging system errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logging system already initialized")]
    AlreadyInitialized,
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Initialize logging from configuration. `RUST_LOG` overrides configured levels.
pub fn init_with_config(config: &LogConfig) -> Result<(), LoggingError> {
    config.validate()?;

    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.level_filter());
    for (module, level) in &config.module_levels {
        if let Some(filter) = parse_level(level) {
            builder.filter_module(module, filter);
        }
    }
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    let include_timestamp = config.include_timestamp;
    let include_module = config.include_module;
    builder.format(move |buf, record| {
        if include_timestamp {
            write!(buf, "{} ", buf.timestamp_millis())?;
        }
        write!(buf, "{:<5} ", record.level())?;
        if include_module {
            write!(buf, "[{}] ", record.module_path().unwrap_or("-"))?;
        }
        writeln!(buf, "{}", record.args())
    });

    builder
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

/// Initialize logging with the default configuration.
pub fn init() -> Result<(), LoggingError> {
    init_with_config(&LogConfig::default())
}

use clap::Parser;
use conflagent::config::load_server_config;
use conflagent::ConflagentHttpServer;
use log::info;
use std::path::PathBuf;

/// Command line options for the HTTP server binary.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Port for the HTTP server, overriding the configuration
    #[arg(long)]
    port: Option<u16>,
    /// Address to bind, overriding the configuration
    #[arg(long)]
    bind: Option<String>,
}

/// Main entry point for the Conflagent HTTP server.
///
/// # Environment Variables
///
/// * `CONFLAGENT_CONFIG` - Path to the configuration file when `--config` is absent
///   (default: conflagent.toml)
/// * `RUST_LOG` - Overrides the configured log levels
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.as_ref().map(|p| p.display().to_string());
    let (mut config, base_dir) = load_server_config(config_path.as_deref())?;
    conflagent::logging::init_with_config(&config.logging)?;
    info!("Starting Conflagent HTTP Server...");

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    let registry = config.build_registry(&base_dir)?;
    if registry.is_empty() {
        log::warn!("No endpoints configured; every page route will answer UNAUTHORIZED");
    }
    info!("Loaded {} endpoint(s): {:?}", registry.len(), registry.names());

    let server = ConflagentHttpServer::new(&config, registry)?;
    server.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["test"]);
        assert!(cli.config.is_none());
        assert!(cli.port.is_none());
        assert!(cli.bind.is_none());
    }

    #[test]
    fn overrides() {
        let cli = Cli::parse_from([
            "test", "--config", "/etc/conflagent.toml", "--port", "8000", "--bind", "0.0.0.0",
        ]);
        assert_eq!(cli.config.unwrap().to_str(), Some("/etc/conflagent.toml"));
        assert_eq!(cli.port, Some(8000));
        assert_eq!(cli.bind.as_deref(), Some("0.0.0.0"));
    }
}

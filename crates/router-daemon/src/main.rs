//! Router Daemon
//!
//! Runs the catalog backend hosting the router entity provider:
//! - Scheduled entity discovery applied as full mutations
//! - `GET /api/catalog/router` status endpoint
//! - GitHub sign-in resolution against the catalog

use clap::Parser;
use router_daemon::{DaemonConfig, DaemonError, DaemonResult, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Router Daemon CLI
#[derive(Parser)]
#[command(name = "routerd")]
#[command(about = "Router Daemon - catalog entity provider backend", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ROUTERD_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "ROUTERD_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level
    #[arg(long, env = "ROUTERD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "ROUTERD_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        backend = %config.backend.base_url,
        "Starting router daemon"
    );

    // Create and run server
    let server = Server::new(config).await?;
    server.run().await
}

//! rendezvous-relay binary entry point.
//!
//! Usage:
//! ```bash
//! rendezvous-relay --config relay.toml
//! rendezvous-relay --bind 127.0.0.1:9000 --verbose
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use http_rendezvous_relay::config::Config;
use http_rendezvous_relay::server::RendezvousServer;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// HTTP rendezvous relay server.
#[derive(Parser, Debug)]
#[command(name = "rendezvous-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    config.validate().context("Invalid configuration")?;

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    tracing::info!("rendezvous-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested");
            }
            shutdown.cancel();
        }
    });

    let server = Arc::new(RendezvousServer::new(config));
    server.serve(listener, shutdown).await?;
    Ok(())
}

//! Main entry point for the Ticketdash backend.
//!
//! This file parses the command line, loads configuration, installs the
//! tracing subscriber, connects the remote API gateway and starts the Axum
//! server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ticketdash_adapters::HttpGateway;
use ticketdash_backend::config::ConfigLoader;
use ticketdash_backend::server::{serve, AppState};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "ticketdash", about = "Session and permission service for the ticketing dashboard")]
struct Cli {
    /// TOML config file.
    #[arg(long, env = "TICKETDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen address.
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config {
        loader = loader.with_file(path);
    }
    let mut config = loader.load()?;
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let gateway = HttpGateway::new(&config.api_base_url, config.request_timeout())?
        .with_token_cookie(&config.api_token_cookie);
    let state = AppState::from_config(Arc::new(gateway), &config);

    serve(&config, state).await?;
    Ok(())
}

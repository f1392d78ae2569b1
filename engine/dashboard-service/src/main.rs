//! Brent Dashboard Service
//!
//! Loads the price and event CSV files once, then serves them over HTTP
//! until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use dashboard_service::{
    create_routes, initialize_logging, load_configuration, shutdown_signal, DashboardState,
};

/// Read-only HTTP API for the Brent oil change point dashboard
#[derive(Parser, Debug)]
#[command(name = "dashboard")]
#[command(about = "Serve Brent prices, events and change points over HTTP")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    port: Option<u16>,

    /// Price CSV path
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Events CSV path
    #[arg(long)]
    events: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    // Load configuration
    let mut config = load_configuration(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(prices) = args.prices {
        config.data.prices_path = prices;
    }
    if let Some(events) = args.events {
        config.data.events_path = events;
    }
    config.validate().context("Invalid configuration")?;

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = initialize_logging(&config.logging)?;
    info!("Starting Brent Dashboard Service v{}", env!("CARGO_PKG_VERSION"));

    // Load data once
    let state = Arc::new(DashboardState::load(&config.data));

    let addr = config.server_addr()?;
    let (bound, server) = warp::serve(create_routes(state))
        .try_bind_with_graceful_shutdown(addr, shutdown_signal())
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Dashboard API listening on http://{}", bound);
    server.await;

    info!("Brent Dashboard Service shutdown complete");
    Ok(())
}

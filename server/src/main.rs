//! Parley server
//!
//! Standalone server binary. Reads its configuration from the file named by
//! `PARLEY_CONFIG` (optional) and `PARLEY_*` environment variables.

use anyhow::{Context, Result};
use parley_server::server::shutdown_signal;
use parley_server::{Server, ServerConfig};
use std::path::PathBuf;
use tracing::info;

fn load_config() -> Result<ServerConfig> {
    let path = std::env::var_os("PARLEY_CONFIG").map(PathBuf::from);
    ServerConfig::load(path.as_deref()).context("Failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = load_config()?;
    info!("Starting Parley server on {}", config.listen_addr);

    let server = Server::bind(config).await?;
    server.serve_until(shutdown_signal()).await
}

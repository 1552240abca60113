//! Command implementations

pub mod client;
pub mod server;

use anyhow::{Context, Result};

/// Validate a "host:port" argument and return it normalized.
fn resolve_address(address: &str) -> Result<String> {
    let (host, port) = parley_shared::utils::parse_address(address)
        .with_context(|| format!("Invalid address {:?}", address))?;
    Ok(format!("{}:{}", host, port))
}

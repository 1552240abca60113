//! Utility functions and helpers

pub mod time;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address {0:?} must have the form host:port")]
    MissingPort(String),

    #[error("address {0:?} has an empty host")]
    EmptyHost(String),

    #[error("invalid port {port:?} in address {address:?}")]
    InvalidPort { address: String, port: String },

    #[error("IPv6 host in {0:?} must be bracketed, e.g. [::1]:8000")]
    UnbracketedIpv6(String),
}

/// Split a `host:port` string (e.g. "127.0.0.1:8000", "localhost:5000").
///
/// The port is taken after the last ':'. IPv6 hosts must be bracketed
/// ("[::1]:8000"); a bare "::1:8000" is ambiguous and rejected.
pub fn parse_address(address: &str) -> Result<(String, u16), AddressError> {
    let address = address.trim();
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| AddressError::MissingPort(address.to_string()))?;

    if host.is_empty() {
        return Err(AddressError::EmptyHost(address.to_string()));
    }

    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return Err(AddressError::UnbracketedIpv6(address.to_string()));
    }

    let port = port.parse::<u16>().map_err(|_| AddressError::InvalidPort {
        address: address.to_string(),
        port: port.to_string(),
    })?;

    Ok((host.to_string(), port))
}

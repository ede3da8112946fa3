//! Endpoint parsing shared by both binaries (spec §6): `host:port` split on
//! the *last* `:` so a bracketed IPv6 literal like `[::1]:2137` still
//! separates correctly, then resolved via DNS if it isn't already a literal
//! address.

use crate::error::ConfigError;
use std::net::SocketAddr;
use tokio::net::lookup_host;

/// Split `host:port` on the last `:`. Accepts bracketed IPv6 (`[::1]:80`),
/// bare IPv4 (`127.0.0.1:80`), and DNS names (`example.com:80`).
pub fn split_host_port(endpoint: &str) -> Result<(&str, u16), ConfigError> {
    let idx = endpoint
        .rfind(':')
        .ok_or_else(|| ConfigError::MissingPort(endpoint.to_string()))?;
    let (host, port_str) = (&endpoint[..idx], &endpoint[idx + 1..]);
    let port: u16 = port_str
        .parse()
        .map_err(|_| ConfigError::MissingPort(endpoint.to_string()))?;
    Ok((host, port))
}

/// Resolve an endpoint to a concrete [`SocketAddr`], performing DNS
/// resolution for names and stripping brackets from IPv6 literals.
pub async fn resolve(endpoint: &str) -> Result<SocketAddr, ConfigError> {
    let (host, port) = split_host_port(endpoint)?;
    let bare_host = host.trim_start_matches('[').trim_end_matches(']');

    if let Ok(addr) = bare_host.parse() {
        return Ok(SocketAddr::new(addr, port));
    }

    let lookup_target = format!("{bare_host}:{port}");
    let mut addrs = lookup_host(&lookup_target)
        .await
        .map_err(|source| ConfigError::Resolve { host: host.to_string(), source })?;
    addrs
        .next()
        .ok_or_else(|| ConfigError::NoAddresses(host.to_string()))
}

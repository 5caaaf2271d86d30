//! Network utility functions
//!
//! This module provides utility functions for network operations.

use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use super::error::ProxyError;

/// Parse a listen address as written in configuration
///
/// Accepts `host:port`, `:port` (all interfaces) and the same forms prefixed
/// with `http://` or `https://`.
///
/// # Arguments
///
/// * `addr` - The address string to parse
///
/// # Returns
///
/// The parsed `SocketAddr`
pub fn parse_bind_address(addr: &str) -> Result<SocketAddr, ProxyError> {
    let trimmed = addr
        .strip_prefix("http://")
        .or_else(|| addr.strip_prefix("https://"))
        .unwrap_or(addr);

    let normalized = if trimmed.starts_with(':') {
        format!("0.0.0.0{}", trimmed)
    } else {
        trimmed.to_string()
    };

    // Try direct parsing first
    if let Ok(socket_addr) = SocketAddr::from_str(&normalized) {
        return Ok(socket_addr);
    }

    // Try using ToSocketAddrs trait
    match normalized.to_socket_addrs() {
        Ok(mut addrs) => addrs.next().ok_or_else(|| {
            ProxyError::BindAddress(addr.to_string(), "no socket addresses returned".to_string())
        }),
        Err(e) => Err(ProxyError::BindAddress(addr.to_string(), e.to_string())),
    }
}

//! Listener binding.
//!
//! # Responsibilities
//! - Resolve the configured host and port
//! - Bind synchronously so bind failures surface from `start`
//! - Prepare the socket for the async acceptor (non-blocking mode)

use std::net::{IpAddr, SocketAddr, TcpListener};
use thiserror::Error;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured host is not an IP address.
    #[error("invalid bind address {host:?}")]
    InvalidAddress { host: String },
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind a TCP listener on `host:port`, ready to be handed to the runtime.
///
/// Returns the listener together with its actual local address, which
/// differs from the requested one when `port` is 0.
pub fn bind(host: &str, port: u16) -> Result<(TcpListener, SocketAddr), ListenerError> {
    let ip: IpAddr = host.parse().map_err(|_| ListenerError::InvalidAddress {
        host: host.to_string(),
    })?;
    let addr = SocketAddr::new(ip, port);

    let listener = TcpListener::bind(addr).map_err(|source| ListenerError::Bind { addr, source })?;
    listener
        .set_nonblocking(true)
        .map_err(|source| ListenerError::Bind { addr, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { addr, source })?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok((listener, local_addr))
}

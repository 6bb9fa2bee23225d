//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (body limit > 0, distinct ports)
//! - Validate addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Half-configured TLS is not an error; the TLS listener is simply skipped

use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_host {0:?} is not an IP address")]
    BindHost(String),
    #[error("listener.http_port and listener.https_port are both {0}")]
    PortClash(u16),
    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let listener = &config.listener;

    if listener.bind_host.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::BindHost(listener.bind_host.clone()));
    }

    if listener.tls_material().is_some()
        && listener.http_port != 0
        && listener.http_port == listener.https_port
    {
        errors.push(ValidationError::PortClash(listener.http_port));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

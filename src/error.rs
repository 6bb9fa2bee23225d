//! Crate-level error types.

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::net::listener::ListenerError;
use crate::routing::matcher::RouteError;

/// Failure type returned by application handlers.
///
/// Any error can be propagated with `?`. The pipeline converts it into a
/// `{code:500,error:<message>}` response for REST routes and ends the
/// session for WebSocket routes.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced to the host while building or starting a server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A REST route template could not be compiled.
    #[error("invalid route: {0}")]
    Route(#[from] RouteError),

    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A listener could not be bound.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// Certificate or key material could not be loaded.
    #[error("failed to load TLS material: {0}")]
    Tls(#[source] std::io::Error),
}

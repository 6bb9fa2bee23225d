//! Embeddable multi-protocol web server.
//!
//! One listening port (optionally a second one for TLS) multiplexes static
//! files, pattern-routed REST endpoints and any number of WebSocket channels
//! with per-channel broadcast. A host application assembles a [`WebServer`]
//! through [`WebServerBuilder`], then drives it with `start`/`stop`.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod channels;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use axum::extract::ws::Message;
pub use channels::{BroadcastReport, WsSender, WsSession};
pub use config::ServerConfig;
pub use error::{HandlerError, ServerError};
pub use http::handler::{RestRequest, ServerHandle};
pub use lifecycle::{ServerState, Shutdown, WebServer, WebServerBuilder};
pub use routing::matcher::{PathMatcher, PathParams};

//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! WebServer::start
//!     → listener.rs (bind plaintext port, then TLS port if configured)
//!     → tls.rs (load PEM certificate chain + private key)
//!     → hand bound sockets to axum-server
//!
//! WebSocket upgrade
//!     → connection.rs (unique connection id for registry + tracing)
//! ```
//!
//! # Design Decisions
//! - Binding is synchronous so "port already in use" reaches the caller of start
//! - TLS material is validated before any socket is bound
//! - TLS is optional and handled transparently by axum-server

pub mod connection;
pub mod listener;
pub mod tls;

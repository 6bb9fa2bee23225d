//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! WebServerBuilder::build (server.rs):
//!     Validate config → Compile routes (user, then built-in) → WebServer
//!
//! WebServer::start (server.rs):
//!     Load TLS → Bind listeners → Spawn serve tasks → Running
//!
//! WebServer::stop (server.rs, shutdown.rs):
//!     Trigger shutdown → Graceful drain of listeners → Stopped
//! ```
//!
//! # Design Decisions
//! - Fail fast at start: bind and TLS errors go back to the caller
//! - Stop never fails; errors past that point are logged
//! - Shutdown has a grace period: forced close after the deadline

pub mod server;
pub mod shutdown;
pub mod state;

pub use server::{WebServer, WebServerBuilder};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use state::ServerState;

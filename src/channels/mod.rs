//! WebSocket channel subsystem.
//!
//! # Data Flow
//! ```text
//! Upgrade accepted (http/websocket.rs)
//!     → session.rs (split socket, spawn writer task, WsSession for the handler)
//!     → registry.rs (insert sender under the route path, guard removes it)
//!
//! broadcast(path, message)
//!     → registry.rs (snapshot senders for path)
//!     → each open sender's queue → writer task → socket
//! ```
//!
//! # Design Decisions
//! - Registry entries hold queue senders, never sockets: no lock spans network I/O
//! - One unbounded queue per connection keeps per-recipient order = call order
//! - Removal is tied to a drop guard so it runs on error, close and panic alike

pub mod registry;
pub mod session;

pub use registry::{BroadcastReport, ConnectionRegistry, Registration};
pub use session::{SendError, WsSender, WsSession};

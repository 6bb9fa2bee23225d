//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (axum-server)
//!     → request.rs (request id)
//!     → middleware/cors.rs (optional, OPTIONS short-circuit)
//!     → server.rs dispatch
//!         → static_files.rs (existing file under the static root)
//!         → static_files.rs (reserved /ui, /swagger, /swagger.json)
//!         → websocket.rs (registered WebSocket path)
//!         → handler.rs contracts → user routes, then handlers.rs built-ins
//!     → response.rs (JSON envelopes)
//! ```

pub mod handler;
pub mod handlers;
pub mod middleware;
pub mod range;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;
pub mod websocket;

pub use handler::{RestHandler, RestRequest, ServerHandle, TokenVerifier, WsHandler};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{build_router, AppState, PipelineOptions, API_PREFIX, BANNER};

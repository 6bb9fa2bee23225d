//! WebSocket upgrade stage.
//!
//! # Responsibilities
//! - Complete the upgrade handshake for registered WebSocket paths
//! - Track each live session in the connection registry
//! - Run the route handler until it returns, fails or the server stops
//!
//! # Data Flow
//! ```text
//! Client ──upgrade──→ dispatch ──→ upgrade() ──→ run_session()
//!                                                  ├─ writer task (queue → socket)
//!                                                  ├─ registry guard
//!                                                  └─ handler(session, server)
//! ```
//!
//! # Design Decisions
//! - Any request on a WebSocket path that is not a valid upgrade gets 400
//! - Handler failures end only their own session
//! - Shutdown abandons in-flight handlers at their next suspension point

use axum::{
    body::Body,
    extract::{ws::WebSocket, FromRequestParts, WebSocketUpgrade},
    http::{HeaderMap, Request, StatusCode},
    response::Response,
};
use futures_util::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::channels::session::{spawn_writer, WsSession};
use crate::http::handler::{ServerHandle, WsHandler};
use crate::http::response::text;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::connection::ConnectionId;
use crate::observability::EventLog;

/// Everything a session needs once the handshake completes.
pub(crate) struct SessionContext {
    pub handler: Arc<dyn WsHandler>,
    pub server: ServerHandle,
    pub shutdown: ShutdownSignal,
    pub events: EventLog,
}

/// Upgrade `request` on `path`, or answer `400 WebSocket only`.
pub(crate) async fn upgrade(path: String, request: Request<Body>, ctx: SessionContext) -> Response {
    let (mut parts, _body) = request.into_parts();

    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            tracing::debug!(path = %path, reason = %rejection, "Rejected non-upgrade request");
            return text(StatusCode::BAD_REQUEST, "WebSocket only");
        }
    };

    let headers = parts.headers;
    let failed_path = path.clone();
    upgrade
        .on_failed_upgrade(move |e| {
            tracing::warn!(path = %failed_path, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| run_session(socket, path, headers, ctx))
}

async fn run_session(socket: WebSocket, path: String, headers: HeaderMap, ctx: SessionContext) {
    let SessionContext {
        handler,
        server,
        mut shutdown,
        events,
    } = ctx;

    let id = ConnectionId::new();
    let (sink, stream) = socket.split();
    let sender = spawn_writer(sink, id);
    let _registration = server.registry().track(&path, id, sender.clone());
    tracing::info!(path = %path, connection_id = %id, "WebSocket session opened");

    let session = WsSession::new(id, path.clone(), headers, sender, stream);
    let outcome = tokio::select! {
        result = AssertUnwindSafe(handler.call(session, server)).catch_unwind() => Some(result),
        _ = shutdown.recv() => None,
    };

    match outcome {
        Some(Ok(Ok(()))) => {
            tracing::info!(path = %path, connection_id = %id, "WebSocket session closed");
        }
        Some(Ok(Err(e))) => {
            events.error(&format!("WebSocket handler error on {path}: {e}"));
        }
        Some(Err(_)) => {
            events.error(&format!("WebSocket handler panicked on {path}"));
        }
        None => {
            tracing::debug!(path = %path, connection_id = %id, "WebSocket session ended by shutdown");
        }
    }
}

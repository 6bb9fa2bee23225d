//! Per-connection WebSocket handles.

use axum::extract::ws::{Message, WebSocket};
use axum::http::HeaderMap;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::net::connection::ConnectionId;

/// The connection's writer has shut down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("WebSocket connection is closed")]
pub struct SendError;

/// Cloneable outbound half of a WebSocket connection.
///
/// Messages are queued and written by a dedicated task in queue order.
#[derive(Debug, Clone)]
pub struct WsSender {
    tx: mpsc::UnboundedSender<Message>,
}

impl WsSender {
    /// Queue a message for delivery.
    pub fn send(&self, message: Message) -> Result<(), SendError> {
        self.tx.send(message).map_err(|_| SendError)
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.send(Message::Text(text.into().into()))
    }

    /// False once the writer has stopped (socket closed or write failed).
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    #[cfg(test)]
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// Start the writer task that owns the socket's sink half.
pub(crate) fn spawn_writer(mut sink: SplitSink<WebSocket, Message>, id: ConnectionId) -> WsSender {
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = sink.send(message).await {
                tracing::debug!(connection_id = %id, error = %e, "WebSocket write failed");
                break;
            }
        }
        // Dropping rx here marks every sender clone as closed.
        drop(rx);
        let _ = sink.close().await;
        tracing::trace!(connection_id = %id, "WebSocket writer finished");
    });

    WsSender { tx }
}

/// A live WebSocket session handed to a route handler.
pub struct WsSession {
    id: ConnectionId,
    path: String,
    headers: HeaderMap,
    sender: WsSender,
    incoming: SplitStream<WebSocket>,
}

impl WsSession {
    pub(crate) fn new(
        id: ConnectionId,
        path: String,
        headers: HeaderMap,
        sender: WsSender,
        incoming: SplitStream<WebSocket>,
    ) -> Self {
        Self {
            id,
            path,
            headers,
            sender,
            incoming,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Route path this session was accepted on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Headers of the upgrade request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A sender that can outlive this borrow (e.g. moved into a spawned task).
    pub fn sender(&self) -> WsSender {
        self.sender.clone()
    }

    pub fn send(&self, message: Message) -> Result<(), SendError> {
        self.sender.send(message)
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.sender.send_text(text)
    }

    /// Next frame from the peer; `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<Result<Message, axum::Error>> {
        self.incoming.next().await
    }
}

impl std::fmt::Debug for WsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsSession")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("open", &self.sender.is_open())
            .finish()
    }
}

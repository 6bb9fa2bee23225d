//! Per-path registry of live WebSocket connections.
//!
//! # Responsibilities
//! - Track open connections per WebSocket route
//! - Remove connections exactly once when their session ends
//! - Broadcast a message to every open connection on a path
//!
//! # Design Decisions
//! - DashMap sharding; no caller ever sees the underlying sets
//! - Broadcast snapshots the set, then sends outside the shard lock
//! - A failed recipient never stops delivery to the others

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Message;

use crate::channels::session::WsSender;
use crate::net::connection::ConnectionId;
use crate::observability::metrics;

/// Outcome of a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients the message was queued for.
    pub delivered: usize,
    /// Recipients skipped because they were no longer open.
    pub skipped: usize,
    /// Recipients that closed between the open check and the send.
    pub failed: usize,
}

/// Live connections, keyed by route path.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    paths: DashMap<String, HashMap<ConnectionId, WsSender>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection under `path`, creating the path's set if absent.
    pub fn register(&self, path: &str, id: ConnectionId, sender: WsSender) {
        self.paths
            .entry(path.to_string())
            .or_default()
            .insert(id, sender);
        metrics::ws_connection_opened(path);
        tracing::debug!(path = %path, connection_id = %id, "Connection registered");
    }

    /// Remove a connection. Returns false if it was already gone.
    pub fn unregister(&self, path: &str, id: ConnectionId) -> bool {
        let (removed, emptied) = match self.paths.get_mut(path) {
            Some(mut set) => {
                let removed = set.remove(&id).is_some();
                (removed, set.is_empty())
            }
            None => (false, false),
        };

        if emptied {
            self.paths.remove_if(path, |_, set| set.is_empty());
        }
        if removed {
            metrics::ws_connection_closed(path);
            tracing::debug!(path = %path, connection_id = %id, "Connection unregistered");
        }
        removed
    }

    /// Register a connection and return a guard that unregisters it on drop.
    pub fn track(self: &Arc<Self>, path: &str, id: ConnectionId, sender: WsSender) -> Registration {
        self.register(path, id, sender);
        Registration {
            registry: Arc::clone(self),
            path: path.to_string(),
            id,
        }
    }

    /// Send `message` to every open connection registered under `path`.
    pub fn broadcast(&self, path: &str, message: Message) -> BroadcastReport {
        let targets: Vec<(ConnectionId, WsSender)> = match self.paths.get(path) {
            Some(set) => set.iter().map(|(id, s)| (*id, s.clone())).collect(),
            None => return BroadcastReport::default(),
        };

        let mut report = BroadcastReport::default();
        for (id, sender) in targets {
            if !sender.is_open() {
                report.skipped += 1;
                continue;
            }
            match sender.send(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::debug!(path = %path, connection_id = %id, error = %e, "Broadcast send failed");
                }
            }
        }

        metrics::record_broadcast(path, report.delivered);
        report
    }

    /// Number of connections currently registered under `path`.
    pub fn connection_count(&self, path: &str) -> usize {
        self.paths.get(path).map(|set| set.len()).unwrap_or(0)
    }

    /// Drop every registration (used when the server stops).
    pub fn clear(&self) {
        for entry in self.paths.iter() {
            for _ in 0..entry.value().len() {
                metrics::ws_connection_closed(entry.key());
            }
        }
        self.paths.clear();
    }
}

/// Keeps a connection registered for as long as it is alive.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    path: String,
    id: ConnectionId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(&self.path, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_to_empty_path_is_noop() {
        let registry = ConnectionRegistry::new();
        let report = registry.broadcast("/ws1", Message::Text("hi".into()));
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_open_connection() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = WsSender::channel();
        let (b, mut rx_b) = WsSender::channel();
        registry.register("/ws1", ConnectionId::new(), a);
        registry.register("/ws1", ConnectionId::new(), b);

        let report = registry.broadcast("/ws1", Message::Text("hello".into()));
        assert_eq!(report.delivered, 2);
        assert_eq!(rx_a.recv().await, Some(Message::Text("hello".into())));
        assert_eq!(rx_b.recv().await, Some(Message::Text("hello".into())));
    }

    #[test]
    fn paths_are_isolated() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = WsSender::channel();
        registry.register("/ws1", ConnectionId::new(), a);

        assert_eq!(registry.broadcast("/ws2", Message::Text("x".into())).delivered, 0);
        assert_eq!(registry.connection_count("/ws1"), 1);
        assert_eq!(registry.connection_count("/ws2"), 0);
    }

    #[test]
    fn closed_connections_are_skipped_without_aborting() {
        let registry = ConnectionRegistry::new();
        let (open, _rx_open) = WsSender::channel();
        let (closed, rx_closed) = WsSender::channel();
        drop(rx_closed);
        registry.register("/ws1", ConnectionId::new(), closed);
        registry.register("/ws1", ConnectionId::new(), open);

        let report = registry.broadcast("/ws1", Message::Text("x".into()));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let (sender, _rx) = WsSender::channel();
        registry.register("/ws1", id, sender);

        assert!(registry.unregister("/ws1", id));
        assert!(!registry.unregister("/ws1", id));
        assert!(!registry.unregister("/never", id));
        assert_eq!(registry.connection_count("/ws1"), 0);
    }

    #[tokio::test]
    async fn dropped_registration_receives_nothing() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (sender, mut rx) = WsSender::channel();
        let guard = registry.track("/ws1", ConnectionId::new(), sender);
        assert_eq!(registry.connection_count("/ws1"), 1);

        drop(guard);
        let report = registry.broadcast("/ws1", Message::Text("after close".into()));
        assert_eq!(report, BroadcastReport::default());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn registration_removed_when_holder_panics() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (sender, _rx) = WsSender::channel();
        let shared = Arc::clone(&registry);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = shared.track("/ws1", ConnectionId::new(), sender);
            panic!("handler failed");
        }));

        assert!(result.is_err());
        assert_eq!(registry.connection_count("/ws1"), 0);
    }

    #[test]
    fn clear_removes_everything() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = WsSender::channel();
        let (b, _rx_b) = WsSender::channel();
        registry.register("/ws1", ConnectionId::new(), a);
        registry.register("/ws2", ConnectionId::new(), b);

        registry.clear();
        assert_eq!(registry.connection_count("/ws1"), 0);
        assert_eq!(registry.connection_count("/ws2"), 0);
    }
}

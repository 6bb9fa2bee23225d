//! Handler contracts and their invocation context.

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{HeaderMap, Method, Request};
use axum::response::Response;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::channels::{BroadcastReport, ConnectionRegistry, WsSession};
use crate::error::HandlerError;
use crate::routing::matcher::PathParams;
use crate::routing::router::normalize_ws_path;

/// Decides whether a request under the API prefix may proceed.
pub type TokenVerifier = Arc<dyn Fn(&Request<Body>) -> bool + Send + Sync>;

/// Server capabilities handed to every handler invocation.
#[derive(Clone)]
pub struct ServerHandle {
    registry: Arc<ConnectionRegistry>,
    static_root: Option<Arc<PathBuf>>,
    max_body_bytes: usize,
}

impl ServerHandle {
    pub(crate) fn new(static_root: Option<PathBuf>, max_body_bytes: usize) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            static_root: static_root.map(Arc::new),
            max_body_bytes,
        }
    }

    /// Send `message` to every open connection on WebSocket route `path`.
    pub fn broadcast(&self, path: &str, message: Message) -> BroadcastReport {
        self.registry.broadcast(&normalize_ws_path(path), message)
    }

    pub fn broadcast_text(&self, path: &str, text: impl Into<String>) -> BroadcastReport {
        self.broadcast(path, Message::Text(text.into().into()))
    }

    /// Open connections on WebSocket route `path`.
    pub fn connection_count(&self, path: &str) -> usize {
        self.registry.connection_count(&normalize_ws_path(path))
    }

    /// Static content directory, if one is configured.
    pub fn static_root(&self) -> Option<&Path> {
        self.static_root.as_deref().map(PathBuf::as_path)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub(crate) fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("static_root", &self.static_root)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

/// A REST request that matched a route template.
#[derive(Debug)]
pub struct RestRequest {
    pub request: Request<Body>,
    pub params: PathParams,
    pub server: ServerHandle,
}

impl RestRequest {
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Value captured by the `{name}` placeholder.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

/// Handler for a REST route.
pub trait RestHandler: Send + Sync + 'static {
    fn call(&self, request: RestRequest) -> BoxFuture<'static, Result<Response, HandlerError>>;
}

impl<F, Fut> RestHandler for F
where
    F: Fn(RestRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
{
    fn call(&self, request: RestRequest) -> BoxFuture<'static, Result<Response, HandlerError>> {
        Box::pin(self(request))
    }
}

/// Handler for a WebSocket route; runs for the lifetime of the session.
pub trait WsHandler: Send + Sync + 'static {
    fn call(&self, session: WsSession, server: ServerHandle)
        -> BoxFuture<'static, Result<(), HandlerError>>;
}

impl<F, Fut> WsHandler for F
where
    F: Fn(WsSession, ServerHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn call(
        &self,
        session: WsSession,
        server: ServerHandle,
    ) -> BoxFuture<'static, Result<(), HandlerError>> {
        Box::pin(self(session, server))
    }
}

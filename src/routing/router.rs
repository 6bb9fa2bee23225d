//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled REST routes in registration order
//! - Store WebSocket handlers keyed by exact path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc without locks)
//! - O(n) template scan (acceptable for typical route counts)
//! - Re-registering a WebSocket path replaces the previous handler

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::http::handler::{RestHandler, WsHandler};
use crate::routing::matcher::{PathMatcher, PathParams, RouteError};

/// A compiled REST route.
pub struct RestRoute {
    matcher: PathMatcher,
    handler: Arc<dyn RestHandler>,
}

impl RestRoute {
    pub fn template(&self) -> &str {
        self.matcher.template()
    }

    pub fn handler(&self) -> &Arc<dyn RestHandler> {
        &self.handler
    }
}

/// REST and WebSocket routes of one server.
#[derive(Default)]
pub struct RouteTable {
    rest: Vec<RestRoute>,
    ws: HashMap<String, Arc<dyn WsHandler>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `template` and append it after every existing REST route.
    pub fn push_rest(
        &mut self,
        template: &str,
        handler: Arc<dyn RestHandler>,
    ) -> Result<(), RouteError> {
        let matcher = PathMatcher::compile(template)?;
        self.rest.push(RestRoute { matcher, handler });
        Ok(())
    }

    /// Register a WebSocket handler, returning the one it replaced.
    pub fn insert_ws(
        &mut self,
        path: &str,
        handler: Arc<dyn WsHandler>,
    ) -> Option<Arc<dyn WsHandler>> {
        self.ws.insert(normalize_ws_path(path), handler)
    }

    /// First REST route (in registration order) matching `path`.
    pub fn match_rest(&self, path: &str) -> Option<(&RestRoute, PathParams)> {
        self.rest
            .iter()
            .find_map(|route| route.matcher.matches(path).map(|params| (route, params)))
    }

    /// WebSocket handler registered for exactly `path`.
    pub fn ws_handler(&self, path: &str) -> Option<&Arc<dyn WsHandler>> {
        self.ws.get(path)
    }

    pub fn ws_paths(&self) -> impl Iterator<Item = &str> {
        self.ws.keys().map(String::as_str)
    }

    pub fn rest_templates(&self) -> impl Iterator<Item = &str> {
        self.rest.iter().map(RestRoute::template)
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("rest", &self.rest_templates().collect::<Vec<_>>())
            .field("ws", &self.ws_paths().collect::<Vec<_>>())
            .finish()
    }
}

/// WebSocket paths always start with `/`.
pub fn normalize_ws_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

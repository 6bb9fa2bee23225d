//! Server assembly and start/stop.
//!
//! # Responsibilities
//! - Collect routes and options through the fluent builder
//! - Freeze routes into an immutable table at `build()`
//! - Bind listeners on `start()` and serve them in background tasks
//! - Cancel listeners and sessions on `stop()` without ever failing
//!
//! # Design Decisions
//! - Bind errors are returned from `start()`; everything after bind is logged
//! - The state machine lives in a watch channel so hosts can await `Stopped`
//! - A supervisor task owns the Running → Stopped transition

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::Request;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::channels::BroadcastReport;
use crate::config::{validate_config, ConfigError, ServerConfig};
use crate::error::ServerError;
use crate::http::handler::{RestHandler, ServerHandle, TokenVerifier, WsHandler};
use crate::http::handlers::builtin_routes;
use crate::http::server::{build_router, AppState, PipelineOptions};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::state::ServerState;
use crate::net::listener::bind;
use crate::net::tls::load_tls_config;
use crate::observability::{EventLog, LogSink};
use crate::routing::router::normalize_ws_path;
use crate::routing::RouteTable;

/// Fluent configuration for a [`WebServer`].
///
/// ```no_run
/// # async fn demo() -> Result<(), webhub::ServerError> {
/// use webhub::{RestRequest, ServerConfig, WebServer, HandlerError};
/// use axum::response::{IntoResponse, Response};
///
/// let server = WebServer::builder(ServerConfig::default())
///     .cors(true)
///     .rest_route("/api/ping", |_req: RestRequest| async move {
///         Ok::<Response, HandlerError>("pong".into_response())
///     })
///     .build()?;
/// server.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct WebServerBuilder {
    config: ServerConfig,
    rest: Vec<(String, Arc<dyn RestHandler>)>,
    ws: Vec<(String, Arc<dyn WsHandler>)>,
    token_verifier: Option<TokenVerifier>,
    log_sink: Option<LogSink>,
}

impl WebServerBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            rest: Vec::new(),
            ws: Vec::new(),
            token_verifier: None,
            log_sink: None,
        }
    }

    pub fn cors(mut self, enabled: bool) -> Self {
        self.config.site.cors = enabled;
        self
    }

    pub fn static_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.site.static_root = Some(path.into());
        self
    }

    /// Include the built-in `/api/*` demo endpoints (on by default).
    pub fn builtin_routes(mut self, enabled: bool) -> Self {
        self.config.site.builtin_routes = enabled;
        self
    }

    pub fn bind_host(mut self, host: impl Into<String>) -> Self {
        self.config.listener.bind_host = host.into();
        self
    }

    pub fn http_port(mut self, port: u16) -> Self {
        self.config.listener.http_port = port;
        self
    }

    /// Gate every `/api` request; returning false answers 401.
    pub fn token_verifier<F>(mut self, verify: F) -> Self
    where
        F: Fn(&Request<Body>) -> bool + Send + Sync + 'static,
    {
        self.token_verifier = Some(Arc::new(verify));
        self
    }

    /// Add a REST route. Routes are matched in the order they are added.
    pub fn rest_route<H: RestHandler>(mut self, template: impl Into<String>, handler: H) -> Self {
        self.rest.push((template.into(), Arc::new(handler)));
        self
    }

    /// Add a WebSocket route. A leading `/` is added when missing.
    pub fn ws_route<H: WsHandler>(mut self, path: impl Into<String>, handler: H) -> Self {
        self.ws.push((path.into(), Arc::new(handler)));
        self
    }

    /// Receive lifecycle and error lines as plain text.
    pub fn log_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.log_sink = Some(Arc::new(sink));
        self
    }

    /// Validate the configuration and compile every route.
    pub fn build(self) -> Result<WebServer, ServerError> {
        validate_config(&self.config).map_err(ConfigError::Validation)?;
        let events = EventLog::new(self.log_sink);

        let mut routes = RouteTable::new();
        for (template, handler) in self.rest {
            routes.push_rest(&template, handler)?;
        }
        if self.config.site.builtin_routes {
            for (template, handler) in builtin_routes() {
                routes.push_rest(template, handler)?;
            }
        }
        for (path, handler) in self.ws {
            let path = normalize_ws_path(&path);
            if routes.insert_ws(&path, handler).is_some() {
                events.warn(&format!("WebSocket route {path} registered twice; keeping the last handler"));
            }
        }
        tracing::debug!(routes = ?routes, "Route table built");

        let handle = ServerHandle::new(
            self.config.site.static_root.clone(),
            self.config.limits.max_body_bytes,
        );
        let (state, _) = watch::channel(ServerState::Stopped);

        Ok(WebServer {
            inner: Arc::new(Inner {
                config: self.config,
                routes: Arc::new(routes),
                handle,
                token_verifier: self.token_verifier,
                events,
                state,
                running: Mutex::new(None),
            }),
        })
    }
}

impl std::fmt::Debug for WebServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebServerBuilder")
            .field("config", &self.config)
            .field("rest", &self.rest.iter().map(|(t, _)| t).collect::<Vec<_>>())
            .field("ws", &self.ws.iter().map(|(p, _)| p).collect::<Vec<_>>())
            .field("token_verifier", &self.token_verifier.is_some())
            .finish()
    }
}

/// An embeddable web server.
///
/// Dropping the server stops it.
#[derive(Debug)]
pub struct WebServer {
    inner: Arc<Inner>,
}

struct Inner {
    config: ServerConfig,
    routes: Arc<RouteTable>,
    handle: ServerHandle,
    token_verifier: Option<TokenVerifier>,
    events: EventLog,
    state: watch::Sender<ServerState>,
    running: Mutex<Option<Running>>,
}

/// Resources of one start/stop cycle.
struct Running {
    shutdown: Shutdown,
    listeners: Vec<axum_server::Handle>,
    addrs: Vec<SocketAddr>,
}

impl WebServer {
    pub fn builder(config: ServerConfig) -> WebServerBuilder {
        WebServerBuilder::new(config)
    }

    /// Bind the listeners and begin serving in the background.
    ///
    /// Does nothing (besides logging) when the server is not stopped.
    /// Returns once every listener is bound.
    pub async fn start(&self) -> Result<(), ServerError> {
        let claimed = self.inner.state.send_if_modified(|state| {
            if *state == ServerState::Stopped {
                *state = ServerState::Starting;
                true
            } else {
                false
            }
        });
        if !claimed {
            self.inner.events.warn("Server is already running");
            return Ok(());
        }

        match self.launch().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.inner.events.error(&format!("Failed to start web server: {e}"));
                self.inner.state.send_replace(ServerState::Stopped);
                Err(e)
            }
        }
    }

    async fn launch(&self) -> Result<(), ServerError> {
        let inner = &self.inner;
        let listener = &inner.config.listener;

        if listener.tls_half_configured() {
            inner
                .events
                .warn("TLS disabled: both cert_path and key_path are required");
        }
        let tls = match listener.tls_material() {
            Some((cert, key)) => Some(load_tls_config(cert, key).await.map_err(ServerError::Tls)?),
            None => None,
        };

        let (http, http_addr) = bind(&listener.bind_host, listener.http_port)?;
        let https = match tls {
            Some(config) => Some((bind(&listener.bind_host, listener.https_port)?, config)),
            None => None,
        };

        let shutdown = Shutdown::new();
        let router = build_router(
            AppState {
                routes: Arc::clone(&inner.routes),
                server: inner.handle.clone(),
                token_verifier: inner.token_verifier.clone(),
                shutdown: shutdown.subscribe(),
                events: inner.events.clone(),
            },
            PipelineOptions {
                cors: inner.config.site.cors,
                max_body_bytes: inner.config.limits.max_body_bytes,
            },
        );

        let mut listeners = Vec::new();
        let mut addrs = vec![http_addr];
        let mut tasks: Vec<JoinHandle<std::io::Result<()>>> = Vec::new();

        let handle = axum_server::Handle::new();
        let app = router.clone().into_make_service();
        let server = axum_server::from_tcp(http).handle(handle.clone());
        tasks.push(tokio::spawn(async move { server.serve(app).await }));
        listeners.push(handle);

        if let Some(((std_listener, https_addr), tls_config)) = https {
            let handle = axum_server::Handle::new();
            let app = router.into_make_service();
            let server = axum_server::from_tcp_rustls(std_listener, tls_config).handle(handle.clone());
            tasks.push(tokio::spawn(async move { server.serve(app).await }));
            listeners.push(handle);
            addrs.push(https_addr);
        }

        *lock(&inner.running) = Some(Running {
            shutdown,
            listeners,
            addrs: addrs.clone(),
        });
        inner.state.send_replace(ServerState::Running);

        let supervised = Arc::clone(inner);
        tokio::spawn(async move {
            for result in futures_util::future::join_all(tasks).await {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => supervised.events.error(&format!("Listener failed: {e}")),
                    Err(e) => supervised.events.error(&format!("Listener task ended abnormally: {e}")),
                }
            }
            supervised.finish();
        });

        let urls: Vec<String> = addrs.iter().map(ToString::to_string).collect();
        inner
            .events
            .info(&format!("Web server started on {}", urls.join(", ")));
        Ok(())
    }

    /// Stop accepting connections and cancel live sessions.
    ///
    /// Never fails and never blocks; calling it on a server that is not
    /// running is a no-op. Use [`wait_stopped`](Self::wait_stopped) to
    /// observe the end of the shutdown.
    pub fn stop(&self) {
        let claimed = self.inner.state.send_if_modified(|state| {
            if *state == ServerState::Running {
                *state = ServerState::Stopping;
                true
            } else {
                false
            }
        });
        if !claimed {
            tracing::debug!(state = %self.state(), "Stop ignored");
            return;
        }

        let grace = Duration::from_secs(self.inner.config.shutdown.grace_secs);
        if let Some(running) = lock(&self.inner.running).as_ref() {
            running.shutdown.trigger();
            for listener in &running.listeners {
                listener.graceful_shutdown(Some(grace));
            }
        }
        self.inner.handle.registry().clear();
        self.inner.events.info("Stopping web server");
    }

    /// Resolves once the server is in the `Stopped` state.
    pub async fn wait_stopped(&self) {
        let mut state = self.inner.state.subscribe();
        let _ = state.wait_for(|s| *s == ServerState::Stopped).await;
    }

    pub fn state(&self) -> ServerState {
        *self.inner.state.borrow()
    }

    /// Bound addresses while running: plaintext first, then TLS.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        lock(&self.inner.running)
            .as_ref()
            .map(|running| running.addrs.clone())
            .unwrap_or_default()
    }

    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.local_addrs().first().copied()
    }

    /// Capabilities shared with handlers (broadcast, connection counts).
    pub fn handle(&self) -> ServerHandle {
        self.inner.handle.clone()
    }

    pub fn broadcast(&self, path: &str, message: Message) -> BroadcastReport {
        self.inner.handle.broadcast(path, message)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }
}

impl Drop for WebServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    fn finish(&self) {
        lock(&self.running).take();
        self.handle.registry().clear();
        self.state.send_replace(ServerState::Stopped);
        self.events.info("Web server stopped.");
    }
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebServer")
            .field("state", &*self.state.borrow())
            .field("routes", &self.routes)
            .finish()
    }
}

fn lock(running: &Mutex<Option<Running>>) -> MutexGuard<'_, Option<Running>> {
    running.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationError;
    use crate::http::handler::RestRequest;
    use crate::error::HandlerError;
    use axum::response::Response;

    async fn noop(_req: RestRequest) -> Result<Response, HandlerError> {
        Ok(Response::default())
    }

    #[test]
    fn build_rejects_bad_template() {
        let result = WebServer::builder(ServerConfig::default())
            .rest_route("api/no-slash", noop)
            .build();
        assert!(matches!(result, Err(ServerError::Route(_))));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let mut config = ServerConfig::default();
        config.limits.max_body_bytes = 0;
        let result = WebServer::builder(config).build();
        match result {
            Err(ServerError::Config(ConfigError::Validation(errors))) => {
                assert_eq!(errors, vec![ValidationError::ZeroBodyLimit]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn user_routes_precede_builtins() {
        let server = WebServer::builder(ServerConfig::default())
            .rest_route("/api/hello", noop)
            .build()
            .unwrap();
        let templates: Vec<&str> = server.inner.routes.rest_templates().collect();
        assert_eq!(templates[0], "/api/hello");
        assert_eq!(templates.iter().filter(|t| **t == "/api/hello").count(), 2);
    }

    #[test]
    fn builtins_can_be_disabled() {
        let server = WebServer::builder(ServerConfig::default())
            .builtin_routes(false)
            .build()
            .unwrap();
        assert_eq!(server.inner.routes.rest_templates().count(), 0);
    }

    #[test]
    fn duplicate_ws_path_warns_and_keeps_last() {
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&lines);
        let server = WebServer::builder(ServerConfig::default())
            .log_sink(move |line| sink.lock().unwrap().push(line.to_string()))
            .ws_route("ws1", |_s: crate::WsSession, _h: ServerHandle| async { Ok::<(), HandlerError>(()) })
            .ws_route("/ws1", |_s: crate::WsSession, _h: ServerHandle| async { Ok::<(), HandlerError>(()) })
            .build()
            .unwrap();

        assert_eq!(server.inner.routes.ws_paths().collect::<Vec<_>>(), vec!["/ws1"]);
        assert!(lines.lock().unwrap().iter().any(|l| l.contains("registered twice")));
    }

    #[test]
    fn stop_before_start_is_noop() {
        let server = WebServer::builder(ServerConfig::default()).build().unwrap();
        server.stop();
        server.stop();
        assert_eq!(server.state(), ServerState::Stopped);
        assert!(server.local_addrs().is_empty());
    }
}

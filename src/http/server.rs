//! Request pipeline.
//!
//! # Responsibilities
//! - Build the axum Router and its middleware layers
//! - Run every request through the ordered stages
//! - Contain REST handler failures at the pipeline boundary
//! - Record request metrics
//!
//! # Data Flow
//! ```text
//! request-id → trace → [cors] → dispatch
//!     → static file → reserved document → websocket → /api → banner → 404
//! ```
//!
//! # Design Decisions
//! - One catch-all route; stage order lives in `dispatch`, not in axum routing
//! - The route table is immutable once built and shared behind an Arc

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{Request, StatusCode},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::http::handler::{RestRequest, ServerHandle, TokenVerifier};
use crate::http::middleware::cors::cors_middleware;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response::{json_error, text};
use crate::http::static_files::{self, ReservedDocument};
use crate::http::websocket::{self, SessionContext};
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::observability::{metrics, EventLog};
use crate::routing::RouteTable;

/// Paths at or below this prefix go to the REST stage.
pub const API_PREFIX: &str = "/api";

/// Plain-text answer for `GET /`.
pub const BANNER: &str = "Web server running. See /ui /swagger /api/hello";

/// Application state injected into the dispatcher.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub server: ServerHandle,
    pub token_verifier: Option<TokenVerifier>,
    pub shutdown: ShutdownSignal,
    pub events: EventLog,
}

/// Pipeline options fixed when the router is built.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub cors: bool,
    pub max_body_bytes: usize,
}

/// Build the axum Router with all middleware layers.
pub fn build_router(state: AppState, options: PipelineOptions) -> Router {
    let mut router = Router::new()
        .route("/", any(dispatch))
        .route("/{*path}", any(dispatch))
        .with_state(state)
        .layer(DefaultBodyLimit::max(options.max_body_bytes));

    if options.cors {
        router = router.layer(middleware::from_fn(cors_middleware));
    }

    router
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}

async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = run_stages(&state, request).await;

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

async fn run_stages(state: &AppState, request: Request<Body>) -> Response {
    let request = match state.server.static_root() {
        Some(root) => match static_files::try_serve(root, request).await {
            Ok(response) => return response,
            Err(request) => request,
        },
        None => request,
    };

    let path = request.uri().path().to_string();

    if let Some(document) = ReservedDocument::from_path(&path) {
        return document.serve(state.server.static_root()).await;
    }

    if let Some(handler) = state.routes.ws_handler(&path) {
        let ctx = SessionContext {
            handler: Arc::clone(handler),
            server: state.server.clone(),
            shutdown: state.shutdown.clone(),
            events: state.events.clone(),
        };
        return websocket::upgrade(path, request, ctx).await;
    }

    if is_api_path(&path) {
        return rest_stage(state, path, request).await;
    }

    if path == "/" {
        return text(StatusCode::OK, BANNER);
    }
    text(StatusCode::NOT_FOUND, "Not Found")
}

fn is_api_path(path: &str) -> bool {
    let prefix_len = API_PREFIX.len();
    path.len() >= prefix_len
        && path.is_char_boundary(prefix_len)
        && path[..prefix_len].eq_ignore_ascii_case(API_PREFIX)
        && matches!(path.as_bytes().get(prefix_len), None | Some(b'/'))
}

async fn rest_stage(state: &AppState, path: String, request: Request<Body>) -> Response {
    if let Some(verify) = &state.token_verifier {
        if !verify(&request) {
            tracing::debug!(request_id = %request.request_id(), path = %path, "Token rejected");
            return json_error(StatusCode::UNAUTHORIZED, "Token required");
        }
    }

    let Some((route, params)) = state.routes.match_rest(&path) else {
        return json_error(StatusCode::NOT_FOUND, "Not Found");
    };

    let request_id = request.request_id().to_string();
    let template = route.template().to_string();
    let call = route.handler().call(RestRequest {
        request,
        params,
        server: state.server.clone(),
    });

    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!(request_id = %request_id, route = %template, "REST handler failed");
            state.events.error(&format!("REST handler error on {path}: {e}"));
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(_) => {
            tracing::error!(request_id = %request_id, route = %template, "REST handler panicked");
            state.events.error(&format!("REST handler panicked on {path}"));
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

//! Static content stages.
//!
//! # Responsibilities
//! - Serve existing files beneath the static root (GET/HEAD only)
//! - Fall through with the untouched request on a miss
//! - Serve the reserved `/ui`, `/swagger`, `/swagger.json` documents
//!
//! # Design Decisions
//! - tower-http `ServeDir` does path validation, content types and ranges
//! - Directories are never listed and never resolve to index files
//! - A missing static root degrades to "not found", never to a startup error

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::Path;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::http::response::text;

/// Serve `request` from `root` if it names an existing file, else hand it back.
pub async fn try_serve(root: &Path, request: Request<Body>) -> Result<Response, Request<Body>> {
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return Err(request);
    }

    let probe = head_only(&request);
    let response = ServeDir::new(root)
        .append_index_html_on_directories(false)
        .oneshot(probe)
        .await
        .unwrap_or_else(|never| match never {});

    if response.status() == StatusCode::NOT_FOUND {
        return Err(request);
    }
    Ok(response.map(Body::new))
}

/// Copy of the request line and headers with an empty body.
fn head_only(request: &Request<Body>) -> Request<Body> {
    let mut probe = Request::new(Body::empty());
    *probe.method_mut() = request.method().clone();
    *probe.uri_mut() = request.uri().clone();
    *probe.version_mut() = request.version();
    *probe.headers_mut() = request.headers().clone();
    probe
}

/// Documents served at fixed paths from the static root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedDocument {
    Ui,
    Swagger,
    SwaggerJson,
}

impl ReservedDocument {
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/ui" => Some(Self::Ui),
            "/swagger" => Some(Self::Swagger),
            "/swagger.json" => Some(Self::SwaggerJson),
            _ => None,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Ui => "ui.html",
            Self::Swagger => "swagger.html",
            Self::SwaggerJson => "swagger.json",
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            Self::Ui | Self::Swagger => "text/html; charset=utf-8",
            Self::SwaggerJson => "application/json",
        }
    }

    fn not_found(self) -> Response {
        match self {
            Self::Ui => text(StatusCode::NOT_FOUND, "ui.html not found"),
            Self::Swagger => text(StatusCode::NOT_FOUND, "swagger.html not found"),
            Self::SwaggerJson => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "swagger.json not found" })),
            )
                .into_response(),
        }
    }

    /// Read the document from `root`, or answer 404 with a diagnostic.
    pub async fn serve(self, root: Option<&Path>) -> Response {
        let Some(root) = root else {
            return self.not_found();
        };
        let path = root.join(self.file_name());
        match tokio::fs::read(&path).await {
            Ok(bytes) => ([(header::CONTENT_TYPE, self.content_type())], bytes).into_response(),
            Err(e) => {
                tracing::debug!(path = ?path, error = %e, "Reserved document unavailable");
                self.not_found()
            }
        }
    }
}

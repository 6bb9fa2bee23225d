//! Built-in demo endpoints under `/api`.
//!
//! Registered after user routes, so a user route with the same template
//! takes precedence.

use axum::{
    extract::{multipart::MultipartError, FromRequest, Multipart},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::collections::btree_map::{BTreeMap, Entry};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::HandlerError;
use crate::http::handler::{RestHandler, RestRequest, ServerHandle};
use crate::http::range::serve_file_range;
use crate::http::response::{json_error, json_ok, method_not_allowed, text};

/// Subdirectory of the static root that receives uploads.
pub const UPLOAD_DIR: &str = "files";

/// Templates and handlers of the built-in endpoints, in match order.
pub fn builtin_routes() -> Vec<(&'static str, Arc<dyn RestHandler>)> {
    vec![
        ("/api/hello", Arc::new(hello) as Arc<dyn RestHandler>),
        ("/api/time", Arc::new(time)),
        ("/api/echo/{val}", Arc::new(echo)),
        ("/api/download/{filename}", Arc::new(download)),
        ("/api/upload/{filename}", Arc::new(upload_raw)),
        ("/api/upload", Arc::new(upload_multipart)),
        ("/api/notification", Arc::new(notification)),
    ]
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Reduce a client-supplied name to its final path component.
///
/// Returns `None` when nothing usable remains (`""`, `.`, `..`).
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    match base {
        "" | "." | ".." => None,
        base => Some(base.to_string()),
    }
}

async fn hello(_req: RestRequest) -> Result<Response, HandlerError> {
    Ok(json_ok(json!({
        "code": 200,
        "msg": "Hello API!",
        "time": now_millis(),
    })))
}

async fn time(_req: RestRequest) -> Result<Response, HandlerError> {
    Ok(json_ok(json!({ "time": now_millis() })))
}

async fn echo(req: RestRequest) -> Result<Response, HandlerError> {
    let val = req.param("val").unwrap_or_default();
    Ok(json_ok(json!({ "echo": val })))
}

async fn download(req: RestRequest) -> Result<Response, HandlerError> {
    let Some(root) = req.server.static_root() else {
        return Ok(text(StatusCode::NOT_FOUND, "Not found"));
    };
    let Some(name) = req.param("filename").and_then(sanitize_file_name) else {
        return Ok(text(StatusCode::NOT_FOUND, "Not found"));
    };
    let range = req.headers().get(header::RANGE);
    Ok(serve_file_range(&root.join(name), range).await?)
}

/// `<static_root>/files`, created on demand. `None` without a static root.
async fn upload_dir(server: &ServerHandle) -> io::Result<Option<PathBuf>> {
    let Some(root) = server.static_root() else {
        return Ok(None);
    };
    let dir = root.join(UPLOAD_DIR);
    tokio::fs::create_dir_all(&dir).await?;
    Ok(Some(dir))
}

fn no_static_root() -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Static root not configured")
}

fn too_large() -> Response {
    json_error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
}

async fn upload_raw(req: RestRequest) -> Result<Response, HandlerError> {
    if req.method() != Method::POST {
        return Ok(method_not_allowed());
    }
    let Some(name) = req.param("filename").and_then(sanitize_file_name) else {
        return Ok(json_error(StatusCode::BAD_REQUEST, "Invalid file name"));
    };
    let Some(dir) = upload_dir(&req.server).await? else {
        return Ok(no_static_root());
    };

    let path = dir.join(&name);
    let limit = req.server.max_body_bytes();
    let mut body = req.request.into_body().into_data_stream();
    let mut file = File::create(&path).await?;
    let mut written = 0usize;

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                discard(file, &path).await;
                return Err(e.into());
            }
        };
        written += chunk.len();
        if written > limit {
            discard(file, &path).await;
            return Ok(too_large());
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::info!(file = %name, bytes = written, "Raw upload saved");
    Ok(json_ok(json!({
        "code": 200,
        "msg": "Upload complete",
        "filename": name,
    })))
}

async fn discard(file: File, path: &Path) {
    drop(file);
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::debug!(path = ?path, error = %e, "Could not remove partial upload");
    }
}

#[derive(Debug, Error)]
enum UploadError {
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Default)]
struct UploadSummary {
    files: Vec<String>,
    fields: BTreeMap<String, String>,
}

async fn upload_multipart(req: RestRequest) -> Result<Response, HandlerError> {
    if req.method() != Method::POST {
        return Ok(method_not_allowed());
    }
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));
    if !is_multipart {
        return Ok(text(
            StatusCode::BAD_REQUEST,
            "Content-Type must be multipart/form-data",
        ));
    }
    let Some(dir) = upload_dir(&req.server).await? else {
        return Ok(no_static_root());
    };

    let multipart = match Multipart::from_request(req.request, &()).await {
        Ok(multipart) => multipart,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    match save_parts(multipart, &dir).await {
        Ok(summary) => {
            tracing::info!(files = ?summary.files, "Multipart upload saved");
            Ok(json_ok(json!({
                "code": 200,
                "msg": "Upload complete",
                "files": summary.files,
                "fields": summary.fields,
            })))
        }
        Err(UploadError::Multipart(e)) => Ok(json_error(e.status(), e.body_text())),
        Err(UploadError::Io(e)) => Err(e.into()),
    }
}

async fn save_parts(mut multipart: Multipart, dir: &Path) -> Result<UploadSummary, UploadError> {
    let mut summary = UploadSummary::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await?;
            match summary.fields.entry(name) {
                Entry::Occupied(mut existing) => {
                    let joined = existing.get_mut();
                    joined.push(',');
                    joined.push_str(&value);
                }
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
            continue;
        };

        let Some(safe) = sanitize_file_name(&file_name) else {
            tracing::debug!(field = %name, "Skipping file part without a usable name");
            continue;
        };

        // Created on the first non-empty chunk so empty parts leave no file.
        let path = dir.join(&safe);
        let mut file: Option<File> = None;
        while let Some(chunk) = field.chunk().await? {
            if chunk.is_empty() {
                continue;
            }
            if file.is_none() {
                file = Some(File::create(&path).await?);
            }
            if let Some(out) = file.as_mut() {
                out.write_all(&chunk).await?;
            }
        }

        if let Some(mut out) = file {
            out.flush().await?;
            summary.files.push(safe);
        }
    }

    Ok(summary)
}

async fn notification(req: RestRequest) -> Result<Response, HandlerError> {
    if req.method() != Method::POST {
        return Ok(method_not_allowed());
    }
    let limit = req.server.max_body_bytes();
    let bytes = match axum::body::to_bytes(req.request.into_body(), limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Notification body rejected");
            return Ok(too_large());
        }
    };

    tracing::info!(body = %String::from_utf8_lossy(&bytes), "Notification received");

    if serde_json::from_slice::<Value>(&bytes).is_err() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "code": 400, "msg": "Invalid JSON." })),
        )
            .into_response());
    }
    Ok(json_ok(json!({ "code": 200, "msg": "Notification received" })))
}

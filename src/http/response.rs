//! Response envelopes.
//!
//! JSON bodies follow `{code:int, ...}`: an `error` key on failure,
//! free-form keys on success.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

/// `{code, error}` envelope with a matching status line.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = json!({ "code": status.as_u16(), "error": message.into() });
    (status, Json(body)).into_response()
}

/// JSON body with status 200.
pub fn json_ok(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

/// Plain-text diagnostic.
pub fn text(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}

pub fn method_not_allowed() -> Response {
    text(StatusCode::METHOD_NOT_ALLOWED, "Only POST allowed")
}

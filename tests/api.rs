//! End-to-end tests for the HTTP pipeline and built-in endpoints.

use axum::response::{IntoResponse, Response};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};
use webhub::{HandlerError, RestRequest};

mod common;

use common::{client, start_server};

#[tokio::test]
async fn hello_and_echo() {
    let t = start_server(|b| b).await;

    let res = client().get(t.url("/api/hello")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 200);
    assert_eq!(body["msg"], "Hello API!");
    assert!(body["time"].as_u64().unwrap() > 0);

    let body: Value = client()
        .get(t.url("/api/echo/hello-world"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "echo": "hello-world" }));
}

#[tokio::test]
async fn unmatched_api_path_is_json_404() {
    let t = start_server(|b| b).await;

    let res = client().get(t.url("/api/does/not/exist")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "code": 404, "error": "Not Found" }));
}

#[tokio::test]
async fn token_verifier_gates_api() {
    let t = start_server(|b| {
        b.token_verifier(|req| {
            req.headers()
                .get("authorization")
                .is_some_and(|v| v == "Bearer secret")
        })
    })
    .await;

    let res = client().get(t.url("/api/hello")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "code": 401, "error": "Token required" }));

    let res = client()
        .get(t.url("/api/hello"))
        .bearer_auth("secret")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Outside /api the verifier is not consulted.
    let res = client().get(t.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn handler_error_is_500_and_server_survives() {
    let t = start_server(|b| {
        b.rest_route("/api/broken", |_req: RestRequest| async move {
            Err::<Response, HandlerError>("disk on fire".into())
        })
    })
    .await;

    let res = client().get(t.url("/api/broken")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "code": 500, "error": "disk on fire" }));

    let res = client().get(t.url("/api/hello")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn first_registered_route_wins() {
    let t = start_server(|b| {
        b.rest_route("/api/a/{x}", |req: RestRequest| async move {
            let x = req.param("x").unwrap_or_default().to_string();
            Ok::<Response, HandlerError>(format!("param:{x}").into_response())
        })
        .rest_route("/api/a/fixed", |_req: RestRequest| async move {
            Ok::<Response, HandlerError>("fixed".into_response())
        })
        .rest_route("/api/hello", |_req: RestRequest| async move {
            Ok::<Response, HandlerError>("overridden".into_response())
        })
    })
    .await;

    let text = client().get(t.url("/api/a/fixed")).send().await.unwrap().text().await.unwrap();
    assert_eq!(text, "param:fixed");

    // User routes precede the built-in ones.
    let text = client().get(t.url("/api/hello")).send().await.unwrap().text().await.unwrap();
    assert_eq!(text, "overridden");
}

#[tokio::test]
async fn download_supports_ranges() {
    let t = start_server(|b| b).await;
    std::fs::write(t.root.path().join("data.bin"), b"0123456789").unwrap();

    let res = client().get(t.url("/api/download/data.bin")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["accept-ranges"], "bytes");
    assert_eq!(res.headers()["content-type"], "application/octet-stream");
    assert_eq!(&res.bytes().await.unwrap()[..], b"0123456789");

    let res = client()
        .get(t.url("/api/download/data.bin"))
        .header("range", "bytes=3-6")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(res.headers()["content-range"], "bytes 3-6/10");
    assert_eq!(&res.bytes().await.unwrap()[..], b"3456");

    let res = client()
        .get(t.url("/api/download/data.bin"))
        .header("range", "bytes=x-y")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client().get(t.url("/api/download/missing.bin")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn raw_upload_saves_base_name_only() {
    let t = start_server(|b| b).await;

    let res = client()
        .post(t.url("/api/upload/..%2Fescape.txt"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["msg"], "Upload complete");

    assert_eq!(body["filename"], "escape.txt");
    let content = std::fs::read_to_string(t.root.path().join("files/escape.txt")).unwrap();
    assert_eq!(content, "payload");
    assert!(!t.root.path().join("escape.txt").exists());

    let res = client().get(t.url("/api/upload/x.txt")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.text().await.unwrap(), "Only POST allowed");
}

#[tokio::test]
async fn multipart_upload_reports_files_and_fields() {
    let t = start_server(|b| b).await;

    let form = Form::new()
        .text("tag", "a")
        .text("tag", "b")
        .text("owner", "ops")
        .part("file", Part::bytes(b"first".to_vec()).file_name("one.txt"))
        .part("file", Part::bytes(Vec::new()).file_name("empty.txt"))
        .part("file", Part::bytes(b"second".to_vec()).file_name("../two.txt"));

    let res = client().post(t.url("/api/upload")).multipart(form).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 200);
    assert_eq!(body["files"], json!(["one.txt", "two.txt"]));
    assert_eq!(body["fields"], json!({ "owner": "ops", "tag": "a,b" }));

    let files = t.root.path().join("files");
    assert_eq!(std::fs::read(files.join("one.txt")).unwrap(), b"first");
    assert_eq!(std::fs::read(files.join("two.txt")).unwrap(), b"second");
    assert!(!files.join("empty.txt").exists());

    let res = client()
        .post(t.url("/api/upload"))
        .header("content-type", "text/plain")
        .body("nope")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notification_accepts_json_only() {
    let t = start_server(|b| b).await;

    let res = client()
        .post(t.url("/api/notification"))
        .body(r#"{"event":"deploy"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "code": 200, "msg": "Notification received" }));

    let res = client()
        .post(t.url("/api/notification"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "code": 400, "msg": "Invalid JSON." }));

    let res = client().get(t.url("/api/notification")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn cors_preflight_and_headers() {
    let t = start_server(|b| b.cors(true)).await;

    let res = client()
        .request(reqwest::Method::OPTIONS, t.url("/api/hello"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        res.headers()["access-control-allow-methods"],
        "GET,POST,PUT,DELETE,OPTIONS"
    );

    let res = client().get(t.url("/api/time")).send().await.unwrap();
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn cors_disabled_adds_nothing() {
    let t = start_server(|b| b).await;

    let res = client().get(t.url("/api/time")).send().await.unwrap();
    assert!(!res.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn static_files_and_reserved_documents() {
    let t = start_server(|b| b).await;
    std::fs::write(t.root.path().join("index.css"), "body{}").unwrap();
    std::fs::write(t.root.path().join("ui.html"), "<h1>ui</h1>").unwrap();

    let res = client().get(t.url("/index.css")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"].to_str().unwrap().starts_with("text/css"));
    assert_eq!(res.text().await.unwrap(), "body{}");

    let res = client().get(t.url("/ui")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/html; charset=utf-8");

    let res = client().get(t.url("/swagger")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "swagger.html not found");

    let res = client().get(t.url("/swagger.json")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "swagger.json not found" }));
}

#[tokio::test]
async fn root_banner_and_plain_404() {
    let t = start_server(|b| b).await;

    let res = client().get(t.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.text().await.unwrap(),
        "Web server running. See /ui /swagger /api/hello"
    );

    let res = client().get(t.url("/no-such-page")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

//! Start/stop behavior of a real server.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use webhub::{ServerError, ServerState, WebServer};

mod common;

use common::{client, loopback_config};

fn captured_lines() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Send + Sync + 'static) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    (lines, move |line: &str| sink.lock().unwrap().push(line.to_string()))
}

#[tokio::test]
async fn second_start_is_a_logged_noop() {
    let (lines, sink) = captured_lines();
    let server = WebServer::builder(loopback_config())
        .log_sink(sink)
        .build()
        .unwrap();

    server.start().await.unwrap();
    let addrs = server.local_addrs();
    server.start().await.unwrap();

    assert_eq!(server.state(), ServerState::Running);
    assert_eq!(server.local_addrs(), addrs);
    assert!(lines
        .lock()
        .unwrap()
        .iter()
        .any(|l| l == "Server is already running"));
}

#[tokio::test]
async fn stop_is_idempotent_and_restart_works() {
    let server = WebServer::builder(loopback_config()).build().unwrap();

    server.start().await.unwrap();
    let first = server.http_addr().unwrap();
    let res = client().get(format!("http://{first}/api/time")).send().await.unwrap();
    assert!(res.status().is_success());

    server.stop();
    server.stop();
    tokio::time::timeout(Duration::from_secs(5), server.wait_stopped())
        .await
        .unwrap();
    assert_eq!(server.state(), ServerState::Stopped);
    assert!(server.local_addrs().is_empty());
    server.stop();

    server.start().await.unwrap();
    assert_eq!(server.state(), ServerState::Running);
    let second = server.http_addr().unwrap();
    let res = client().get(format!("http://{second}/api/hello")).send().await.unwrap();
    assert!(res.status().is_success());
}

#[tokio::test]
async fn stopped_server_refuses_connections() {
    let server = WebServer::builder(loopback_config()).build().unwrap();
    server.start().await.unwrap();
    let addr = server.http_addr().unwrap();

    server.stop();
    tokio::time::timeout(Duration::from_secs(5), server.wait_stopped())
        .await
        .unwrap();

    assert!(client().get(format!("http://{addr}/")).send().await.is_err());
}

#[tokio::test]
async fn port_in_use_is_returned_from_start() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let (lines, sink) = captured_lines();
    let server = WebServer::builder(loopback_config())
        .http_port(port)
        .log_sink(sink)
        .build()
        .unwrap();

    let err = server.start().await.unwrap_err();
    assert!(matches!(err, ServerError::Listener(_)));
    assert_eq!(server.state(), ServerState::Stopped);
    assert!(lines
        .lock()
        .unwrap()
        .iter()
        .any(|l| l.starts_with("Failed to start web server")));
}

#[tokio::test]
async fn missing_tls_material_fails_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = loopback_config();
    config.listener.https_port = 0;
    config.listener.cert_path = Some(dir.path().join("cert.pem"));
    config.listener.key_path = Some(dir.path().join("key.pem"));

    let server = WebServer::builder(config).build().unwrap();
    let err = server.start().await.unwrap_err();
    assert!(matches!(err, ServerError::Tls(_)));
    assert_eq!(server.state(), ServerState::Stopped);
}

//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use tempfile::TempDir;
use webhub::{ServerConfig, WebServer, WebServerBuilder};

/// A running server on an ephemeral loopback port with its own static root.
pub struct TestServer {
    pub server: WebServer,
    pub addr: SocketAddr,
    pub root: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

pub fn loopback_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_host = "127.0.0.1".to_string();
    config.listener.http_port = 0;
    config.shutdown.grace_secs = 1;
    config
}

/// Build with `configure`, point the static root at a fresh temp dir, start.
pub async fn start_server<F>(configure: F) -> TestServer
where
    F: FnOnce(WebServerBuilder) -> WebServerBuilder,
{
    let root = tempfile::tempdir().unwrap();
    let builder = WebServer::builder(loopback_config()).static_root(root.path());
    let server = configure(builder).build().unwrap();
    server.start().await.unwrap();
    let addr = server.http_addr().unwrap();

    TestServer { server, addr, root }
}

/// HTTP client that ignores proxy environment variables.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `webhub_requests_total` (counter): requests by method, status
//! - `webhub_request_duration_seconds` (histogram): pipeline latency
//! - `webhub_ws_connections` (gauge): open WebSocket sessions by path
//! - `webhub_broadcast_messages_total` (counter): broadcast deliveries by path

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("webhub_requests_total", &labels).increment(1);
    metrics::histogram!("webhub_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn ws_connection_opened(path: &str) {
    metrics::gauge!("webhub_ws_connections", "path" => path.to_string()).increment(1.0);
}

pub fn ws_connection_closed(path: &str) {
    metrics::gauge!("webhub_ws_connections", "path" => path.to_string()).decrement(1.0);
}

pub fn record_broadcast(path: &str, delivered: usize) {
    metrics::counter!("webhub_broadcast_messages_total", "path" => path.to_string())
        .increment(delivered as u64);
}

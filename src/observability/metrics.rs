//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): calls by action, status
//! - `gateway_request_duration_seconds` (histogram): call latency by action
//! - `gateway_endpoints` (gauge): endpoints installed at startup

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched request.
pub fn record_request(action: &str, method: &str, status: u16, start: Instant) {
    let labels = [
        ("action", action.to_string()),
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", "action" => action.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record the size of the endpoint table.
pub fn record_endpoints(count: usize) {
    gauge!("gateway_endpoints").set(count as f64);
}

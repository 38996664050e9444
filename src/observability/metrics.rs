//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_upstream_errors_total` (counter): transport failures by upstream
//! - `gateway_active_connections` (gauge): open client connections
//!
//! Updates go through the `metrics` facade and are no-ops until an exporter
//! is installed.

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::{Method, StatusCode};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Route label for requests that matched nothing.
pub const NO_ROUTE: &str = "none";

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &Method, status: StatusCode, route: &str, started: Instant) {
    let route = route.to_string();
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.as_u16().to_string(),
        "route" => route.clone()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_upstream_error(upstream: &str) {
    counter!("gateway_upstream_errors_total", "upstream" => upstream.to_string()).increment(1);
}

pub fn set_active_connections(count: usize) {
    gauge!("gateway_active_connections").set(count as f64);
}

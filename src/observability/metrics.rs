//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Describe the server's metrics
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `auth_decisions_total` (counter): authorization gate decisions by outcome
//! - `jwks_fetches_total` (counter): signing key fetches by result
//! - `jwks_cached_keys` (gauge): keys in the current cache snapshot
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - The exporter listens on its own address, never on the API listener

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

static DESCRIBE: Once = Once::new();

/// Install the Prometheus exporter and register metric descriptions.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_metrics();
    tracing::info!(address = %addr, "Prometheus metrics endpoint started");
    Ok(())
}

fn describe_metrics() {
    DESCRIBE.call_once(|| {
        describe_counter!("http_requests_total", "Total HTTP requests by method and status");
        describe_histogram!(
            "http_request_duration_seconds",
            "HTTP request latency in seconds"
        );
        describe_counter!("auth_decisions_total", "Authorization gate decisions by outcome");
        describe_counter!("jwks_fetches_total", "Signing key set fetches by result");
        describe_gauge!("jwks_cached_keys", "Signing keys in the current cache snapshot");
    });
}

/// Record a completed HTTP request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record one authorization gate decision.
pub fn record_auth_decision(outcome: &'static str) {
    counter!("auth_decisions_total", "outcome" => outcome).increment(1);
}

/// Record one signing key set fetch attempt (`ok`, `error` or `throttled`).
pub fn record_key_fetch(result: &'static str) {
    counter!("jwks_fetches_total", "result" => result).increment(1);
}

/// Record the size of the current key cache snapshot.
pub fn record_cached_keys(count: usize) {
    gauge!("jwks_cached_keys").set(count as f64);
}

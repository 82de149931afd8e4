//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dropship_token_refresh_total` (counter): refreshes by trigger and outcome
//! - `dropship_fetch_attempts_total` (counter): fetch attempts by outcome
//! - `dropship_fetch_duration_seconds` (histogram): whole fetch latency
//! - `dropship_extraction_total` (counter): extractions by field and method
//! - `dropship_sync_push_total` (counter): dashboard pushes by outcome
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_token_refresh(trigger: &'static str, outcome: &'static str) {
    metrics::counter!(
        "dropship_token_refresh_total",
        "trigger" => trigger,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_fetch_attempt(outcome: &'static str) {
    metrics::counter!("dropship_fetch_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_fetch(outcome: &'static str, start: Instant) {
    metrics::histogram!("dropship_fetch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_extraction(field: &'static str, method: String) {
    metrics::counter!("dropship_extraction_total", "field" => field, "method" => method)
        .increment(1);
}

pub fn record_sync_push(outcome: &'static str) {
    metrics::counter!("dropship_sync_push_total", "outcome" => outcome).increment(1);
}

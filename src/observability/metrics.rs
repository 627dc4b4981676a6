//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by method, status
//! - `edge_request_duration_seconds` (histogram): latency distribution
//! - `edge_gate_decisions_total` (counter): gate outcome by decision
//! - `edge_upstream_attempts_total` (counter): upstream attempts by outcome
//! - `edge_upstream_retries_total` (counter): attempts that were retried
//! - `edge_dedup_joined_total` (counter): callers that joined an in-flight request
//! - `edge_dedup_pending` (gauge): in-flight deduplicated requests
//! - `edge_dedup_purged_total` (counter): entries removed by the sweeper

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("edge_requests_total", "method" => method.to_string(), "status" => status)
        .increment(1);
    histogram!("edge_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_gate_decision(decision: &'static str) {
    counter!("edge_gate_decisions_total", "decision" => decision).increment(1);
}

pub fn record_upstream_attempt(outcome: &'static str) {
    counter!("edge_upstream_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_upstream_retry() {
    counter!("edge_upstream_retries_total").increment(1);
}

pub fn record_dedup_joined() {
    counter!("edge_dedup_joined_total").increment(1);
}

pub fn record_dedup_pending(count: usize) {
    gauge!("edge_dedup_pending").set(count as f64);
}

pub fn record_dedup_purged(count: usize) {
    counter!("edge_dedup_purged_total").increment(count as u64);
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, rule
//! - `proxy_request_duration_seconds` (histogram): latency by rule
//! - `proxy_rule_matches_total` (counter): lookups by matched rule (`none` on miss)
//! - `proxy_config_reloads_total` (counter): reload attempts by result
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so the routing
//!   core and tests never need one
//! - Rules are labelled by their position in the configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Label value for a rule index, `none` when nothing matched.
pub fn rule_label(index: Option<usize>) -> String {
    index.map_or_else(|| "none".to_string(), |i| i.to_string())
}

pub fn record_request(method: &str, status: u16, rule: &str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "rule" => rule.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "rule" => rule.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rule_match(rule: &str) {
    counter!("proxy_rule_matches_total", "rule" => rule.to_string()).increment(1);
}

pub fn record_config_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("proxy_config_reloads_total", "result" => result).increment(1);
}

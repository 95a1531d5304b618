//! Metrics collection and exposition.
//!
//! # Metrics
//! - `spa_fallback_decisions_total` (counter): decisions by `outcome` and `reason`
//!
//! `reason` is the skip reason for skips, `rule` or `index` for rewrites.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::rewrite::Decision;

const DECISIONS: &str = "spa_fallback_decisions_total";

/// Start the Prometheus scrape endpoint. Requires a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(decision: &Decision) {
    let (outcome, reason) = match decision {
        Decision::Skip { reason } => ("skip", reason.as_str()),
        Decision::Rewrite { rule: Some(_), .. } => ("rewrite", "rule"),
        Decision::Rewrite { rule: None, .. } => ("rewrite", "index"),
    };
    metrics::counter!(DECISIONS, "outcome" => outcome, "reason" => reason).increment(1);
}

pub fn record_error() {
    metrics::counter!(DECISIONS, "outcome" => "error", "reason" => "config").increment(1);
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_decisions_total{outcome}` (counter): allowed / blocked / rate_limited / content_rejected
//! - `guard_security_events_total{kind,severity}` (counter)
//! - `guard_blocks_created_total{cause}` (counter): auto_block / critical_event
//! - `guard_alerts_dropped_total{reason}` (counter)
//! - `guard_active_blocks`, `guard_window_entries` (gauges, refreshed by the sweeper)
//! - `guard_rules_loaded`, `guard_rules_rejected` (gauges, refreshed on reload)

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_decision(outcome: &'static str) {
    counter!("guard_decisions_total", "outcome" => outcome).increment(1);
}

pub fn record_security_event(kind: &'static str, severity: &str) {
    counter!(
        "guard_security_events_total",
        "kind" => kind,
        "severity" => severity.to_string()
    )
    .increment(1);
}

pub fn record_block_created(cause: &'static str) {
    counter!("guard_blocks_created_total", "cause" => cause).increment(1);
}

pub fn record_alert_dropped(reason: &'static str) {
    counter!("guard_alerts_dropped_total", "reason" => reason).increment(1);
}

pub fn record_table_sizes(window_entries: usize, active_blocks: usize) {
    gauge!("guard_window_entries").set(window_entries as f64);
    gauge!("guard_active_blocks").set(active_blocks as f64);
}

pub fn record_rules_loaded(accepted: usize, rejected: usize) {
    gauge!("guard_rules_loaded").set(accepted as f64);
    gauge!("guard_rules_rejected").set(rejected as f64);
}

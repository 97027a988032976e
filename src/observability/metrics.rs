//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tap_requests_total` (counter): requests by method, status
//! - `tap_request_duration_seconds` (histogram): handling latency
//! - `tap_broadcast_delivered_total` (counter): events queued to observers
//! - `tap_broadcast_dropped_total` (counter): events lost to full/closed queues
//! - `tap_observers_connected` (gauge)
//! - `tap_active_connections` (gauge)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter. Must run inside the tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "tap_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("tap_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_broadcast(delivered: usize, dropped: usize) {
    counter!("tap_broadcast_delivered_total").increment(delivered as u64);
    if dropped > 0 {
        counter!("tap_broadcast_dropped_total").increment(dropped as u64);
    }
}

pub fn set_observers(count: usize) {
    gauge!("tap_observers_connected").set(count as f64);
}

pub fn set_active_connections(count: u64) {
    gauge!("tap_active_connections").set(count as f64);
}

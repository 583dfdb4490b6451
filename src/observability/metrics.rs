//! Metrics collection and exposition.
//!
//! # Metrics
//! - `webhook_requests_total` (counter): requests by port, routing key, status
//! - `webhook_request_duration_seconds` (histogram): pipeline latency
//! - `webhook_listeners_registered` (gauge): listeners in the registry
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished webhook request.
pub fn record_request(port: u16, routing_key: &str, status: u16, start: Instant) {
    counter!(
        "webhook_requests_total",
        "port" => port.to_string(),
        "routing_key" => routing_key.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "webhook_request_duration_seconds",
        "port" => port.to_string(),
        "routing_key" => routing_key.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record the number of registered listeners.
pub fn record_listener_count(count: usize) {
    gauge!("webhook_listeners_registered").set(count as f64);
}

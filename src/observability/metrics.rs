//! Metrics collection and exposition.
//!
//! # Metrics
//! - `memproxy_client_connections_total` (counter): accepted clients by port
//! - `memproxy_active_client_connections` (gauge): open client sessions
//! - `memproxy_downstream_connect_errors_total` (counter): failed connects by downstream
//! - `memproxy_wait_queue_timeouts_total` (counter): clients that gave up waiting for a slot
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_client_connection(port: u16) {
    ::metrics::counter!("memproxy_client_connections_total", "port" => port.to_string()).increment(1);
}

pub fn set_active_client_connections(active: u64) {
    ::metrics::gauge!("memproxy_active_client_connections").set(active as f64);
}

pub fn record_downstream_connect_error(downstream: &str) {
    ::metrics::counter!("memproxy_downstream_connect_errors_total", "downstream" => downstream.to_string())
        .increment(1);
}

pub fn record_wait_queue_timeout(port: u16) {
    ::metrics::counter!("memproxy_wait_queue_timeouts_total", "port" => port.to_string()).increment(1);
}

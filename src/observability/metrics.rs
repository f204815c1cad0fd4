//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pixy_listener_crashes_total` (counter): listener crashes by role
//! - `pixy_service_phase` (gauge): current lifecycle phase as a number
//! - `pixy_broker_reachable` (gauge): 1=reachable, 0=unreachable, per broker

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::component::ListenerRole;
use crate::lifecycle::Phase;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_listener_crash(role: ListenerRole) {
    metrics::counter!("pixy_listener_crashes_total", "role" => role.as_str()).increment(1);
}

pub fn record_phase(phase: Phase) {
    metrics::gauge!("pixy_service_phase").set(phase as u8 as f64);
}

pub fn record_broker_reachable(broker: &str, reachable: bool) {
    metrics::gauge!("pixy_broker_reachable", "broker" => broker.to_string())
        .set(if reachable { 1.0 } else { 0.0 });
}

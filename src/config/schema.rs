//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
///
/// Consumed by [`Service::spawn`](crate::lifecycle::service::Service::spawn);
/// immutable from that point on.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address of the mandatory HTTP API listener (Unix socket path).
    pub unix_addr: String,

    /// Address of the second HTTP API listener (`host:port`).
    /// An empty string disables it entirely.
    pub tcp_addr: String,

    /// Kafka broker endpoints, handed as-is to the backend client.
    pub broker_addrs: Vec<String>,

    /// Backend client tuning.
    pub backend: BackendConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            unix_addr: "/var/run/kafka-pixy.sock".to_string(),
            tcp_addr: String::new(),
            broker_addrs: vec!["localhost:9092".to_string()],
            backend: BackendConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Whether the optional TCP listener is configured.
    pub fn tcp_enabled(&self) -> bool {
        !self.tcp_addr.is_empty()
    }
}

/// Broker reachability probing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Interval between probes while at least one broker is reachable.
    pub probe_interval_ms: u64,

    /// Connect timeout for a single broker probe.
    pub probe_timeout_ms: u64,

    /// Base delay for exponential backoff while no broker is reachable.
    pub backoff_base_ms: u64,

    /// Maximum backoff delay.
    pub backoff_max_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: 5_000,
            probe_timeout_ms: 1_000,
            backoff_base_ms: 100,
            backoff_max_ms: 10_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

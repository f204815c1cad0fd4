//! Broker reachability probing.
//!
//! # Responsibilities
//! - Periodically dial each broker with a timeout
//! - Log reachability transitions and export them as gauges
//! - Back off while the whole cluster is unreachable

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time;

use crate::config::BackendConfig;
use crate::lifecycle::shutdown::StopReceiver;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

pub struct BrokerProbe {
    brokers: Vec<String>,
    config: BackendConfig,
    /// Last observed state per broker; `None` until first probed.
    reachable: Vec<Option<bool>>,
}

impl BrokerProbe {
    pub fn new(brokers: Vec<String>, config: BackendConfig) -> Self {
        let reachable = vec![None; brokers.len()];
        Self {
            brokers,
            config,
            reachable,
        }
    }

    /// Probe until `stop` fires.
    pub async fn run(mut self, mut stop: StopReceiver) {
        tracing::info!(
            brokers = ?self.brokers,
            interval_ms = self.config.probe_interval_ms,
            "Broker probe starting"
        );

        let interval = Duration::from_millis(self.config.probe_interval_ms);
        let mut failed_rounds = 0u32;

        loop {
            let any_up = tokio::select! {
                up = self.probe_all() => up,
                _ = stop.fired() => break,
            };

            let delay = if any_up {
                failed_rounds = 0;
                interval
            } else {
                failed_rounds = failed_rounds.saturating_add(1);
                tracing::warn!(attempt = failed_rounds, "No broker reachable");
                calculate_backoff(
                    failed_rounds,
                    self.config.backoff_base_ms,
                    self.config.backoff_max_ms,
                )
            };

            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = stop.fired() => break,
            }
        }

        tracing::info!("Broker probe stopped");
    }

    /// Probe every broker once. Returns whether any of them answered.
    pub async fn probe_all(&mut self) -> bool {
        let timeout = Duration::from_millis(self.config.probe_timeout_ms);
        let mut any_up = false;

        for (broker, last) in self.brokers.iter().zip(self.reachable.iter_mut()) {
            let up = probe_one(broker, timeout).await;
            any_up |= up;

            if *last != Some(up) {
                if up {
                    tracing::info!(broker = %broker, "Broker reachable");
                } else {
                    tracing::warn!(broker = %broker, "Broker unreachable");
                }
                *last = Some(up);
            }
            metrics::record_broker_reachable(broker, up);
        }

        any_up
    }

    pub fn reachable(&self) -> &[Option<bool>] {
        &self.reachable
    }
}

async fn probe_one(broker: &str, timeout: Duration) -> bool {
    match time::timeout(timeout, TcpStream::connect(broker)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::debug!(broker = %broker, error = %e, "Broker probe failed: connection error");
            false
        }
        Err(_) => {
            tracing::debug!(broker = %broker, "Broker probe failed: timeout");
            false
        }
    }
}

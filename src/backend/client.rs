//! Broker client.
//!
//! # Responsibilities
//! - Validate and own the broker address list
//! - Run the reachability probe between start and stop
//! - Let the supervisor wait for full stop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::backend::probe::BrokerProbe;
use crate::backend::BackendError;
use crate::config::BackendConfig;
use crate::lifecycle::component::BackendClient;
use crate::lifecycle::shutdown::StopSignal;

/// Session manager for a Kafka cluster.
#[derive(Debug)]
pub struct BrokerClient {
    brokers: Vec<String>,
    config: BackendConfig,
    started: AtomicBool,
    disposed: AtomicBool,
    stop: StopSignal,
    /// Moved into the probe task on start; dropped when it exits.
    done_tx: Mutex<Option<watch::Sender<()>>>,
    done_rx: watch::Receiver<()>,
}

impl BrokerClient {
    pub fn new(broker_addrs: &[String], config: BackendConfig) -> Result<Self, BackendError> {
        if broker_addrs.is_empty() {
            return Err(BackendError::NoBrokers);
        }
        for addr in broker_addrs {
            validate_broker_addr(addr)?;
        }

        let (done_tx, done_rx) = watch::channel(());
        Ok(Self {
            brokers: broker_addrs.to_vec(),
            config,
            started: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            stop: StopSignal::new(),
            done_tx: Mutex::new(Some(done_tx)),
            done_rx,
        })
    }

    pub fn brokers(&self) -> &[String] {
        &self.brokers
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl BackendClient for BrokerClient {
    fn name(&self) -> &str {
        "kafka"
    }

    fn start(&self) {
        if self.is_disposed() {
            tracing::warn!("Ignoring start of disposed Kafka client");
            return;
        }
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::warn!("Kafka client already started");
            return;
        }

        let done_tx = match self.done_tx.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let probe = BrokerProbe::new(self.brokers.clone(), self.config.clone());
        let stop = self.stop.subscribe();
        tokio::spawn(async move {
            probe.run(stop).await;
            drop(done_tx);
        });
    }

    fn stop(&self) {
        if self.stop.trigger() {
            tracing::info!("Kafka client stopping");
        }
    }

    async fn wait_for_stop(&self) {
        if !self.is_started() {
            return;
        }
        let mut done = self.done_rx.clone();
        // Resolves with an error once the probe task dropped its sender.
        while done.changed().await.is_ok() {}
    }

    fn dispose(&self) {
        if self.is_started() {
            tracing::warn!("Disposing a started Kafka client; stopping it instead");
        }
        self.disposed.store(true, Ordering::Release);
        self.stop.trigger();
        tracing::debug!(brokers = ?self.brokers, "Kafka client disposed");
    }
}

fn validate_broker_addr(addr: &str) -> Result<(), BackendError> {
    let invalid = || BackendError::InvalidBrokerAddress(addr.to_string());
    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(invalid());
    }
    Ok(())
}

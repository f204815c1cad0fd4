//! Service façade.
//!
//! Owns construction of the components and the supervisor task, and exposes
//! the two operations the outside world needs: [`Service::stop`] and
//! [`Service::wait_for_stop`].

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::BackendError;
use crate::config::{ConfigError, ServiceConfig};
use crate::lifecycle::component::{BackendClient, ComponentFactory, ListenerRole};
use crate::lifecycle::reporter::{CrashReporter, TracingReporter};
use crate::lifecycle::shutdown::StopSignal;
use crate::lifecycle::startup;
use crate::lifecycle::supervisor::{set_phase, Phase, Supervisor};
use crate::net::listener::ListenerError;

/// Errors returned by [`Service::spawn`]. No other operation fails.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid configuration: {0}")]
    Config(#[source] ConfigError),

    #[error("failed to spawn Kafka client: {0}")]
    Backend(#[source] BackendError),

    #[error("failed to start {} HTTP API listener on {addr}: {source}", .role.transport())]
    Listener {
        role: ListenerRole,
        addr: String,
        #[source]
        source: ListenerError,
    },
}

/// A running service.
///
/// Dropping the handle without calling [`stop`](Self::stop) also starts the
/// shutdown sequence, since nothing could stop the service afterwards.
#[derive(Debug)]
pub struct Service {
    stop: StopSignal,
    phase_rx: watch::Receiver<Phase>,
}

impl Service {
    /// Construct all components and launch the supervisor.
    ///
    /// Must be called from within a Tokio runtime. On error nothing is left
    /// running and any constructed backend client has been disposed.
    pub fn spawn(
        config: &ServiceConfig,
        factory: &dyn ComponentFactory,
    ) -> Result<Self, ServiceError> {
        Self::spawn_with_reporter(config, factory, Arc::new(TracingReporter))
    }

    /// Like [`spawn`](Self::spawn), with a custom crash reporter.
    pub fn spawn_with_reporter(
        config: &ServiceConfig,
        factory: &dyn ComponentFactory,
        reporter: Arc<dyn CrashReporter>,
    ) -> Result<Self, ServiceError> {
        let components = startup::construct(config, factory)?;

        let backend = components.backend.clone();
        let stop = StopSignal::new();
        let (phase_tx, phase_rx) = watch::channel(Phase::Starting);
        let phase_tx = Arc::new(phase_tx);
        let supervisor = Supervisor::new(components, stop.subscribe(), reporter, phase_tx.clone());
        let task = tokio::spawn(supervisor.run());
        tokio::spawn(watch_supervisor(task, backend, phase_tx));

        tracing::info!(
            unix_addr = %config.unix_addr,
            tcp_addr = %config.tcp_addr,
            brokers = ?config.broker_addrs,
            "Service spawned"
        );
        Ok(Self { stop, phase_rx })
    }

    /// Ask the service to shut down.
    ///
    /// Safe to call any number of times; returns `true` only for the call
    /// that actually initiated shutdown.
    pub fn stop(&self) -> bool {
        let fired = self.stop.trigger();
        if !fired {
            tracing::debug!("Stop already requested");
        }
        fired
    }

    /// Wait until every component has stopped.
    ///
    /// Any number of callers may wait concurrently; all of them resolve once
    /// the backend client has fully stopped.
    pub async fn wait_for_stop(&self) {
        let mut rx = self.phase_rx.clone();
        if rx.wait_for(|phase| *phase == Phase::Stopped).await.is_err() {
            tracing::error!(
                phase = ?self.phase(),
                "Supervisor exited before the backend client stopped"
            );
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase_rx.borrow()
    }

    pub fn is_stopped(&self) -> bool {
        self.phase() == Phase::Stopped
    }
}

/// Await the supervisor task and finish its job if it died.
///
/// A supervisor that panics while starting or stopping listeners drops them
/// as it unwinds, so the backend client is the only component left to stop.
/// If it panicked while the backend was already stopping, the backend is not
/// touched again.
async fn watch_supervisor(
    task: JoinHandle<()>,
    backend: Arc<dyn BackendClient>,
    phase_tx: Arc<watch::Sender<Phase>>,
) {
    let err = match task.await {
        Ok(()) => return,
        Err(err) => err,
    };
    let phase = *phase_tx.borrow();
    if err.is_panic() {
        tracing::error!(
            phase = ?phase,
            panic = %panic_message(err.into_panic()),
            "Supervisor task panicked"
        );
    } else {
        tracing::error!(phase = ?phase, "Supervisor task cancelled");
    }
    if phase >= Phase::Draining {
        return;
    }

    set_phase(&phase_tx, Phase::Draining);
    backend.stop();
    backend.wait_for_stop().await;
    tracing::info!(backend = backend.name(), "Backend client stopped");
    set_phase(&phase_tx, Phase::Stopped);
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

//! Supervisor control loop.
//!
//! Drives the components through start, run, stop and drain. The ordering
//! it enforces is the point of the whole service: every listener must have
//! fully stopped before the backend client is asked to stop, whatever ended
//! the run phase.

use std::sync::Arc;

use tokio::sync::watch;

use crate::lifecycle::component::{CrashChannel, Listener, ListenerRole};
use crate::lifecycle::reporter::CrashReporter;
use crate::lifecycle::shutdown::StopReceiver;
use crate::lifecycle::startup::Components;
use crate::net::listener::ListenerError;
use crate::observability::metrics;

/// Lifecycle phase of a service.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Components constructed and the supervisor task spawned; not yet
    /// started.
    Starting = 0,
    /// All components started; waiting for a stop request or a crash.
    Running = 1,
    /// Listeners asked to stop; waiting for them to finish.
    Stopping = 2,
    /// Listeners gone; backend client shutting down.
    Draining = 3,
    /// Everything stopped.
    Stopped = 4,
}

/// What ended the run phase.
enum Trigger {
    Stop,
    Crash(ListenerRole),
}

/// A started listener together with its crash channel.
struct Running {
    role: ListenerRole,
    listener: Box<dyn Listener>,
    crash_rx: CrashChannel,
    /// Cleared once the channel closed during the run phase.
    open: bool,
}

impl Running {
    fn start(role: ListenerRole, mut listener: Box<dyn Listener>) -> Self {
        let crash_rx = listener.start();
        tracing::info!(
            role = %role,
            transport = %listener.transport(),
            address = %listener.addr(),
            "Listener started"
        );
        Self {
            role,
            listener,
            crash_rx,
            open: true,
        }
    }

    /// Wait for the next crash-channel event. Never called once closed.
    async fn next(&mut self) -> Option<ListenerError> {
        self.crash_rx.recv().await
    }
}

async fn next_optional(slot: &mut Option<Running>) -> Option<ListenerError> {
    match slot {
        Some(running) => running.next().await,
        // Guarded by the select precondition; never polled.
        None => None,
    }
}

pub(crate) struct Supervisor {
    components: Components,
    stop_rx: StopReceiver,
    reporter: Arc<dyn CrashReporter>,
    phase_tx: Arc<watch::Sender<Phase>>,
}

impl Supervisor {
    pub(crate) fn new(
        components: Components,
        stop_rx: StopReceiver,
        reporter: Arc<dyn CrashReporter>,
        phase_tx: Arc<watch::Sender<Phase>>,
    ) -> Self {
        Self {
            components,
            stop_rx,
            reporter,
            phase_tx,
        }
    }

    /// Run the whole lifecycle to completion.
    pub(crate) async fn run(self) {
        let Supervisor {
            components,
            mut stop_rx,
            reporter,
            phase_tx,
        } = self;
        let Components {
            backend,
            required,
            optional,
        } = components;

        // Start: backend first so listeners never see an idle client.
        backend.start();
        tracing::info!(backend = backend.name(), "Backend client started");
        let mut required = Running::start(ListenerRole::Required, required);
        let mut optional = optional.map(|l| Running::start(ListenerRole::Optional, l));
        set_phase(&phase_tx, Phase::Running);

        let trigger = wait_for_trigger(&mut stop_rx, &mut required, &mut optional, &*reporter).await;
        match trigger {
            Trigger::Stop => tracing::info!("Stop requested, shutting down"),
            Trigger::Crash(role) => {
                tracing::warn!(role = %role, "Shutting down after listener crash")
            }
        }
        set_phase(&phase_tx, Phase::Stopping);

        // Stop: issue every stop request before waiting on any of them.
        required.listener.stop();
        if let Some(running) = &optional {
            running.listener.stop();
        }
        drain(&mut required, &*reporter).await;
        if let Some(running) = optional.as_mut() {
            drain(running, &*reporter).await;
        }

        // Drain: listeners are gone, nothing can reach the backend anymore.
        set_phase(&phase_tx, Phase::Draining);
        backend.stop();
        backend.wait_for_stop().await;
        tracing::info!(backend = backend.name(), "Backend client stopped");

        set_phase(&phase_tx, Phase::Stopped);
    }
}

/// Block until a stop request or a listener crash.
///
/// A crash channel that closes without a value means that listener went away
/// cleanly on its own; it is dropped from the wait and waiting continues.
async fn wait_for_trigger(
    stop_rx: &mut StopReceiver,
    required: &mut Running,
    optional: &mut Option<Running>,
    reporter: &dyn CrashReporter,
) -> Trigger {
    loop {
        let optional_open = optional.as_ref().is_some_and(|r| r.open);
        tokio::select! {
            _ = stop_rx.fired() => return Trigger::Stop,
            event = required.next(), if required.open => match event {
                Some(cause) => return crashed(required, &cause, reporter),
                None => closed(required),
            },
            event = next_optional(optional), if optional_open => {
                if let Some(running) = optional.as_mut() {
                    match event {
                        Some(cause) => return crashed(running, &cause, reporter),
                        None => closed(running),
                    }
                }
            }
        }
    }
}

fn crashed(running: &Running, cause: &ListenerError, reporter: &dyn CrashReporter) -> Trigger {
    reporter.listener_crashed(running.role, running.listener.addr(), cause);
    Trigger::Crash(running.role)
}

fn closed(running: &mut Running) {
    tracing::debug!(
        role = %running.role,
        address = %running.listener.addr(),
        "Listener closed cleanly before shutdown"
    );
    running.open = false;
}

/// Wait for a stopped listener's crash channel to close.
async fn drain(running: &mut Running, reporter: &dyn CrashReporter) {
    while let Some(cause) = running.crash_rx.recv().await {
        reporter.listener_crashed(running.role, running.listener.addr(), &cause);
    }
    tracing::info!(
        role = %running.role,
        address = %running.listener.addr(),
        "Listener stopped"
    );
}

pub(crate) fn set_phase(phase_tx: &watch::Sender<Phase>, phase: Phase) {
    tracing::debug!(phase = ?phase, "Service phase changed");
    metrics::record_phase(phase);
    phase_tx.send_replace(phase);
}

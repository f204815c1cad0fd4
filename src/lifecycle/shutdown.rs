//! Stop signal for the supervisor.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// One-shot, latched stop signal.
///
/// Fires at most once; later triggers are no-ops. The value is latched, so a
/// subscriber that starts waiting after the trigger still observes it.
#[derive(Debug)]
pub struct StopSignal {
    fired: AtomicBool,
    tx: watch::Sender<bool>,
}

impl StopSignal {
    /// Create an open (not yet fired) signal.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            fired: AtomicBool::new(false),
            tx,
        }
    }

    /// Subscribe to the signal.
    pub fn subscribe(&self) -> StopReceiver {
        StopReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Fire the signal. Returns `true` only for the call that fired it.
    pub fn trigger(&self) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.tx.send_replace(true);
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Waiting side of a [`StopSignal`].
#[derive(Debug, Clone)]
pub struct StopReceiver {
    rx: watch::Receiver<bool>,
}

impl StopReceiver {
    /// Resolve once the signal fired.
    ///
    /// Also resolves if the [`StopSignal`] was dropped, since nothing can
    /// fire it anymore.
    pub async fn fired(&mut self) {
        let _ = self.rx.wait_for(|fired| *fired).await;
    }
}

//! Lifecycle contracts for the supervised components.
//!
//! The supervisor knows nothing about what a backend client or a listener
//! does; it only drives them through these traits. Concrete implementations
//! live in [`crate::backend`] and [`crate::net`], and tests plug in
//! instrumented doubles through [`ComponentFactory`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::backend::BackendError;
use crate::net::listener::ListenerError;

/// Channel through which a running listener reports how it terminated.
///
/// Yields at most one value, the crash cause, and is then closed. A listener
/// that shuts down cleanly closes it without sending anything, so a `None`
/// from `recv` doubles as the "fully stopped" notification.
pub type CrashChannel = mpsc::Receiver<ListenerError>;

/// Sending half of a [`CrashChannel`].
pub type CrashSender = mpsc::Sender<ListenerError>;

/// Create a crash channel pair.
pub fn crash_channel() -> (CrashSender, CrashChannel) {
    mpsc::channel(1)
}

/// Kind of socket a listener binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Unix,
    Tcp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Unix => "unix",
            Transport::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the service's listeners a component is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerRole {
    /// The mandatory listener; its transport is always [`Transport::Unix`].
    Required,
    /// The second listener, present only when configured.
    Optional,
}

impl ListenerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerRole::Required => "required",
            ListenerRole::Optional => "optional",
        }
    }

    /// Transport the service binds for this role.
    pub fn transport(&self) -> Transport {
        match self {
            ListenerRole::Required => Transport::Unix,
            ListenerRole::Optional => Transport::Tcp,
        }
    }
}

impl fmt::Display for ListenerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Long-lived session manager shared by all listeners.
#[async_trait]
pub trait BackendClient: Send + Sync + 'static {
    /// Name used in logs and status output.
    fn name(&self) -> &str;

    /// Begin background work. Called once, before any listener starts.
    fn start(&self);

    /// Request shutdown. Returns immediately.
    fn stop(&self);

    /// Resolve once the client has fully stopped, or immediately if it was
    /// never started.
    async fn wait_for_stop(&self);

    /// Release resources of a client that was never started.
    fn dispose(&self);
}

/// Network-facing front end bound to one address.
pub trait Listener: Send + 'static {
    fn transport(&self) -> Transport;

    fn addr(&self) -> &str;

    /// Start serving and hand back the crash channel.
    fn start(&mut self) -> CrashChannel;

    /// Request shutdown. Completion is signalled by the crash channel closing.
    fn stop(&self);
}

/// Builds the components a service supervises.
pub trait ComponentFactory {
    fn new_backend(&self, broker_addrs: &[String]) -> Result<Arc<dyn BackendClient>, BackendError>;

    /// Construct a listener bound to `addr` that forwards work to `backend`.
    fn new_listener(
        &self,
        transport: Transport,
        addr: &str,
        backend: Arc<dyn BackendClient>,
    ) -> Result<Box<dyn Listener>, ListenerError>;
}

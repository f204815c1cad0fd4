//! Crash reporting.

use crate::lifecycle::component::ListenerRole;
use crate::net::listener::ListenerError;
use crate::observability::metrics;

/// Sink for listener crashes observed by the supervisor.
///
/// Reporting is informational only: a crash always ends in the normal
/// shutdown sequence whatever the reporter does.
pub trait CrashReporter: Send + Sync + 'static {
    fn listener_crashed(&self, role: ListenerRole, addr: &str, cause: &ListenerError);
}

/// Default reporter: an error-level log event plus a crash counter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl CrashReporter for TracingReporter {
    fn listener_crashed(&self, role: ListenerRole, addr: &str, cause: &ListenerError) {
        tracing::error!(
            role = %role,
            transport = %role.transport(),
            address = %addr,
            error = %cause,
            "HTTP API listener crashed"
        );
        metrics::record_listener_crash(role);
    }
}

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Build backend client → Build listeners
//!     (any failure: dispose backend, return error, nothing runs)
//!
//! Supervision (supervisor.rs):
//!     Start backend → Start listeners → Wait for stop or crash
//!     → Stop listeners → Wait for listeners → Stop backend → Wait for backend
//!
//! Shutdown (shutdown.rs):
//!     Service::stop → latched one-shot signal → supervisor leaves run phase
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Service::stop
//! ```
//!
//! # Design Decisions
//! - Ordered startup: backend first, then listeners
//! - Ordered shutdown: listeners fully stopped before the backend stops
//! - A listener crash and an explicit stop take the same shutdown path

pub mod component;
pub mod reporter;
pub mod service;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod supervisor;

pub use component::{BackendClient, ComponentFactory, CrashChannel, Listener, ListenerRole, Transport};
pub use reporter::{CrashReporter, TracingReporter};
pub use service::{Service, ServiceError};
pub use shutdown::StopSignal;
pub use startup::DefaultFactory;
pub use supervisor::Phase;

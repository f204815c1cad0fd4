//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Service::spawn
//!     → listener.rs (bind Unix socket or TCP address, synchronously)
//! Supervisor start
//!     → listener.rs (serve HTTP API, hand back crash channel)
//! Supervisor stop
//!     → graceful shutdown → crash channel closes
//! ```
//!
//! # Design Decisions
//! - Binding happens at construction so address errors surface from spawn
//! - One crash channel per listener doubles as its stop notification

pub mod listener;

pub use listener::{HttpApiListener, ListenerError};

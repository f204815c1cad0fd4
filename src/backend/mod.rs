//! Backend client subsystem.
//!
//! # Data Flow
//! ```text
//! broker_addrs (config)
//!     → client.rs (validate, own session state, start/stop/wait)
//!     → probe.rs (periodic reachability checks while running)
//!     → resilience::backoff (delay between probes while all brokers are down)
//! ```
//!
//! # Design Decisions
//! - Addresses are validated at construction so a bad broker list fails spawn
//! - The probe task is the only background work; stopping it stops the client
//! - Reachability is informational: an unreachable cluster is logged, not fatal

pub mod client;
pub mod probe;

use thiserror::Error;

pub use client::BrokerClient;

/// Errors raised while constructing a backend client.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no broker addresses configured")]
    NoBrokers,

    #[error("invalid broker address {0:?}, expected host:port")]
    InvalidBrokerAddress(String),
}

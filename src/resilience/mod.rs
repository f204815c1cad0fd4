//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Broker probe round fails for every broker:
//!     → backoff.rs (exponential delay with jitter before the next round)
//! ```
//!
//! # Design Decisions
//! - Delays are capped so a recovered cluster is noticed within bounded time
//! - Jitter avoids synchronized reconnect storms across instances

pub mod backoff;

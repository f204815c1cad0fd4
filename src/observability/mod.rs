//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Supervisor, listeners, backend client produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields, not interpolated strings, for machine parsing
//! - Metrics go through the `metrics` facade; without an installed
//!   recorder every update is a no-op

pub mod logging;
pub mod metrics;

//! Kafka-Pixy service supervisor.
//!
//! Starts a Kafka backend client and one or two HTTP API listeners, and shuts
//! them down in dependency order when asked to, or when a listener crashes.

pub mod backend;
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::schema::ServiceConfig;
pub use lifecycle::{DefaultFactory, Phase, Service, ServiceError};

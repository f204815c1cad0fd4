//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, backoff bounds ordered)
//! - Detect conflicting listener addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Address syntax is left to the components that bind or dial them

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unix_addr must not be empty")]
    MissingUnixAddr,

    #[error("at least one broker address is required")]
    NoBrokers,

    #[error("broker address #{0} is empty")]
    EmptyBroker(usize),

    #[error("tcp_addr and unix_addr must differ, both are {0:?}")]
    DuplicateListenAddr(String),

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("backoff_base_ms ({base}) exceeds backoff_max_ms ({max})")]
    BackoffBounds { base: u64, max: u64 },
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.unix_addr.trim().is_empty() {
        errors.push(ValidationError::MissingUnixAddr);
    }

    if config.broker_addrs.is_empty() {
        errors.push(ValidationError::NoBrokers);
    }
    for (i, broker) in config.broker_addrs.iter().enumerate() {
        if broker.trim().is_empty() {
            errors.push(ValidationError::EmptyBroker(i));
        }
    }

    if config.tcp_enabled() && config.tcp_addr == config.unix_addr {
        errors.push(ValidationError::DuplicateListenAddr(config.tcp_addr.clone()));
    }

    let backend = &config.backend;
    if backend.probe_interval_ms == 0 {
        errors.push(ValidationError::NotPositive { field: "probe_interval_ms" });
    }
    if backend.probe_timeout_ms == 0 {
        errors.push(ValidationError::NotPositive { field: "probe_timeout_ms" });
    }
    if backend.backoff_base_ms > backend.backoff_max_ms {
        errors.push(ValidationError::BackoffBounds {
            base: backend.backoff_base_ms,
            max: backend.backoff_max_ms,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.unix_addr = String::new();
        config.broker_addrs.clear();
        config.backend.probe_timeout_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingUnixAddr,
                ValidationError::NoBrokers,
                ValidationError::NotPositive { field: "probe_timeout_ms" },
            ]
        );
    }

    #[test]
    fn rejects_same_address_for_both_listeners() {
        let mut config = ServiceConfig::default();
        config.unix_addr = "127.0.0.1:1".into();
        config.tcp_addr = "127.0.0.1:1".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::DuplicateListenAddr(_)));
    }

    #[test]
    fn empty_tcp_addr_is_not_a_conflict() {
        let mut config = ServiceConfig::default();
        config.unix_addr = "A".into();
        config.broker_addrs = vec!["b1".into()];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_inverted_backoff_bounds() {
        let mut config = ServiceConfig::default();
        config.backend.backoff_base_ms = 500;
        config.backend.backoff_max_ms = 100;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::BackoffBounds { base: 500, max: 100 }]);
    }

    #[test]
    fn rejects_blank_broker_entry() {
        let mut config = ServiceConfig::default();
        config.broker_addrs = vec!["b1:9092".into(), "  ".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyBroker(1)]);
    }

    #[test]
    fn leaves_address_syntax_to_the_listener() {
        let mut config = ServiceConfig::default();
        config.tcp_addr = "not-a-socket-addr".into();
        assert!(validate_config(&config).is_ok());
    }
}

//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Construct components in dependency order: backend, then listeners
//! - Clean up whatever was built when a later step fails
//!
//! # Design Decisions
//! - Fail fast: any construction error is returned to the caller
//! - Nothing is started here; the supervisor starts components once the
//!   whole set exists

use std::sync::Arc;

use crate::backend::{BackendError, BrokerClient};
use crate::config::{BackendConfig, ConfigError, ServiceConfig};
use crate::config::validation::validate_config;
use crate::lifecycle::component::{
    BackendClient, ComponentFactory, Listener, ListenerRole, Transport,
};
use crate::lifecycle::service::ServiceError;
use crate::net::listener::{HttpApiListener, ListenerError};

/// Fully constructed, not yet started, component set.
pub(crate) struct Components {
    pub(crate) backend: Arc<dyn BackendClient>,
    pub(crate) required: Box<dyn Listener>,
    pub(crate) optional: Option<Box<dyn Listener>>,
}

/// Build every component for `config`, or none of them.
pub(crate) fn construct(
    config: &ServiceConfig,
    factory: &dyn ComponentFactory,
) -> Result<Components, ServiceError> {
    validate_config(config).map_err(|errors| ServiceError::Config(ConfigError::Validation(errors)))?;

    let backend = factory
        .new_backend(&config.broker_addrs)
        .map_err(ServiceError::Backend)?;

    let required = match build_listener(factory, ListenerRole::Required, &config.unix_addr, &backend) {
        Ok(listener) => listener,
        Err(err) => {
            backend.dispose();
            return Err(err);
        }
    };

    let optional = if config.tcp_enabled() {
        match build_listener(factory, ListenerRole::Optional, &config.tcp_addr, &backend) {
            Ok(listener) => Some(listener),
            Err(err) => {
                // `required` was bound but never started; dropping it is enough.
                backend.dispose();
                return Err(err);
            }
        }
    } else {
        None
    };

    Ok(Components {
        backend,
        required,
        optional,
    })
}

fn build_listener(
    factory: &dyn ComponentFactory,
    role: ListenerRole,
    addr: &str,
    backend: &Arc<dyn BackendClient>,
) -> Result<Box<dyn Listener>, ServiceError> {
    factory
        .new_listener(role.transport(), addr, Arc::clone(backend))
        .map_err(|source| ServiceError::Listener {
            role,
            addr: addr.to_string(),
            source,
        })
}

/// Factory for the production components: a [`BrokerClient`] and
/// [`HttpApiListener`]s.
#[derive(Debug, Clone, Default)]
pub struct DefaultFactory {
    backend: BackendConfig,
}

impl DefaultFactory {
    pub fn new(backend: BackendConfig) -> Self {
        Self { backend }
    }
}

impl ComponentFactory for DefaultFactory {
    fn new_backend(&self, broker_addrs: &[String]) -> Result<Arc<dyn BackendClient>, BackendError> {
        let client = BrokerClient::new(broker_addrs, self.backend.clone())?;
        Ok(Arc::new(client))
    }

    fn new_listener(
        &self,
        transport: Transport,
        addr: &str,
        backend: Arc<dyn BackendClient>,
    ) -> Result<Box<dyn Listener>, ListenerError> {
        let listener = HttpApiListener::bind(transport, addr, backend)?;
        Ok(Box::new(listener))
    }
}

//! Service registration.
//!
//! Services are collected while the application is being assembled and mounted
//! once, in registration order, right before the listener binds.

use std::sync::Arc;

use crate::routing::{GroupRegistry, RegistryError};

/// A component that knows how to mount its own routes.
pub trait RouteService: Send + Sync {
    /// Record routes and middleware on the groups this service owns.
    fn mount(&self, groups: &GroupRegistry) -> Result<(), RegistryError>;

    /// Name used in startup logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Ordered, append-only list of services.
///
/// No deduplication: a service registered twice is mounted twice.
#[derive(Default)]
pub struct ServiceRegistrar {
    services: Vec<Arc<dyn RouteService>>,
}

impl ServiceRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, service: Arc<dyn RouteService>) {
        self.services.push(service);
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Mount every service in insertion order.
    ///
    /// Stops at the first failing service; startup is expected to abort.
    pub fn mount_all(&self, groups: &GroupRegistry) -> Result<usize, MountError> {
        for (index, service) in self.services.iter().enumerate() {
            tracing::debug!(service = %service.name(), index, "Mounting service");
            service.mount(groups).map_err(|source| MountError {
                service: service.name().to_string(),
                source,
            })?;
        }

        tracing::info!(count = self.services.len(), "Services mounted");
        Ok(self.services.len())
    }
}

/// A service failed to mount.
#[derive(Debug, thiserror::Error)]
#[error("service {service} failed to mount: {source}")]
pub struct MountError {
    pub service: String,
    #[source]
    pub source: RegistryError,
}

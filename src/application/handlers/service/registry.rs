//! ServiceRegistry - factories keyed by service kind.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::market::{ServiceProposal, ServiceType};
use crate::domain::service::ServiceOptions;
use crate::ports::{Service, ServiceError, ServiceFactory};

/// Maps each [`ServiceType`] to the factory that builds its instances.
#[derive(Default)]
pub struct ServiceRegistry {
    factories: RwLock<HashMap<ServiceType, Arc<dyn ServiceFactory>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` for `service_type`, replacing any earlier one.
    pub fn register(&self, service_type: ServiceType, factory: Arc<dyn ServiceFactory>) {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(service_type, factory);
    }

    pub fn is_registered(&self, service_type: ServiceType) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&service_type)
    }

    pub fn registered_types(&self) -> Vec<ServiceType> {
        let mut types: Vec<ServiceType> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        types.sort();
        types
    }

    /// Builds a new instance for `options` with the matching factory.
    ///
    /// The factory runs on every call, so it sees location and port state
    /// as of this start request.
    ///
    /// # Errors
    ///
    /// - `UnknownType` if no factory is registered for the options' kind
    /// - whatever the factory returns
    pub async fn create(
        &self,
        options: ServiceOptions,
    ) -> Result<(Arc<dyn Service>, ServiceProposal), ServiceError> {
        let service_type = options.service_type();
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&service_type)
            .cloned()
            .ok_or(ServiceError::UnknownType(service_type))?;

        factory.create(options).await
    }
}

//! Service instance events.

use serde::{Deserialize, Serialize};

use super::ServiceStatus;
use crate::domain::foundation::{domain_event, topics, EventId, Identity, ServiceId, Timestamp};
use crate::domain::market::ServiceType;

/// Published on every lifecycle transition of a service instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatusChanged {
    pub event_id: EventId,
    pub service_id: ServiceId,
    pub service_type: ServiceType,
    pub provider_id: Identity,
    pub status: ServiceStatus,
    pub changed_at: Timestamp,
}

domain_event!(
    ServiceStatusChanged,
    event_type = topics::SERVICE_STATUS_CHANGED,
    aggregate_id = service_id,
    aggregate_type = "Service",
    occurred_at = changed_at,
    event_id = event_id
);

impl ServiceStatusChanged {
    pub fn new(
        service_id: ServiceId,
        service_type: ServiceType,
        provider_id: Identity,
        status: ServiceStatus,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            service_id,
            service_type,
            provider_id,
            status,
            changed_at: Timestamp::now(),
        }
    }
}

//! Service proposals published to discovery.

use serde::{Deserialize, Serialize};

use super::ServiceType;
use crate::domain::foundation::{Amount, Identity};

/// Where the provider node is located, as seen from the outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// Public IP the location was resolved for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Node type reported by the resolver (residential, hosting, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

impl Location {
    pub fn in_country(country: impl Into<String>) -> Self {
        Self {
            country: country.into().to_uppercase(),
            city: None,
            ip: None,
            node_type: None,
        }
    }
}

/// Price terms of a proposal, in base units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub per_minute: Amount,
    pub per_gib: Amount,
}

/// Advertised service offer. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProposal {
    provider_id: Identity,
    service_type: ServiceType,
    location: Location,
    price: Price,
}

impl ServiceProposal {
    pub fn new(provider_id: Identity, service_type: ServiceType, location: Location, price: Price) -> Self {
        Self {
            provider_id,
            service_type,
            location,
            price,
        }
    }

    pub fn provider_id(&self) -> &Identity {
        &self.provider_id
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn price(&self) -> &Price {
        &self.price
    }

    /// Dialog topic consumers address to reach this service.
    pub fn dialog_topic(&self) -> String {
        format!("{}.{}", self.provider_id, self.service_type)
    }
}

//! Provider registration domain module.
//!
//! # Events
//!
//! - `ProviderRegistered` - Registration transaction confirmed
//! - `RegistrationFailed` - All attempts exhausted

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    domain_event, topics, Amount, ContractAddress, EventId, Identity, Timestamp,
};

/// Published when the provider identity is registered on-chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRegistered {
    pub event_id: EventId,
    pub provider_id: Identity,
    pub registry: ContractAddress,
    pub stake: Amount,
    pub attempts: u32,
    pub registered_at: Timestamp,
}

domain_event!(
    ProviderRegistered,
    event_type = topics::REGISTRATION_COMPLETED,
    aggregate_id = provider_id,
    aggregate_type = "Provider",
    occurred_at = registered_at,
    event_id = event_id
);

impl ProviderRegistered {
    pub fn new(provider_id: Identity, registry: ContractAddress, stake: Amount, attempts: u32) -> Self {
        Self {
            event_id: EventId::new(),
            provider_id,
            registry,
            stake,
            attempts,
            registered_at: Timestamp::now(),
        }
    }
}

/// Published after the registrar gave up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationFailed {
    pub event_id: EventId,
    pub provider_id: Identity,
    pub attempts: u32,
    pub last_error: String,
    pub failed_at: Timestamp,
}

domain_event!(
    RegistrationFailed,
    event_type = topics::REGISTRATION_FAILED,
    aggregate_id = provider_id,
    aggregate_type = "Provider",
    occurred_at = failed_at,
    event_id = event_id
);

impl RegistrationFailed {
    pub fn new(provider_id: Identity, attempts: u32, last_error: impl Into<String>) -> Self {
        Self {
            event_id: EventId::new(),
            provider_id,
            attempts,
            last_error: last_error.into(),
            failed_at: Timestamp::now(),
        }
    }
}

//! Session aggregate.
//!
//! A session is one consumer/provider exchange running on a service instance.
//! Session storage is the single source of truth: the manager keeps the live
//! channel and payment engine beside it, never inside it.

use serde::{Deserialize, Serialize};

use super::{ConnectivityStatus, SessionError};
use crate::domain::foundation::{Identity, ServiceId, SessionId, StateMachine, Timestamp};
use crate::domain::market::{ServiceProposal, ServiceType};

/// One consumer session.
///
/// # Invariants
///
/// - `id` is unique for the lifetime of the node
/// - `status` only moves forward along [`ConnectivityStatus`] transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    consumer_id: Identity,
    provider_id: Identity,
    service_id: ServiceId,
    service_type: ServiceType,
    status: ConnectivityStatus,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Session {
    /// Creates a negotiating session for a consumer of the proposed service.
    pub fn new(
        id: SessionId,
        consumer_id: Identity,
        service_id: ServiceId,
        proposal: &ServiceProposal,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            consumer_id,
            provider_id: proposal.provider_id().clone(),
            service_id,
            service_type: proposal.service_type(),
            status: ConnectivityStatus::Negotiating,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Identity of the consumer that opened the session.
    pub fn consumer_id(&self) -> &Identity {
        &self.consumer_id
    }

    pub fn provider_id(&self) -> &Identity {
        &self.provider_id
    }

    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn status(&self) -> ConnectivityStatus {
        self.status
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns true once the session reached a terminal status.
    pub fn is_ended(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves the session to `target`, returning the previous status.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if `target` is not reachable from the current status.
    pub fn update_status(
        &mut self,
        target: ConnectivityStatus,
    ) -> Result<ConnectivityStatus, SessionError> {
        let from = self.status;
        self.status = from
            .transition_to(target)
            .map_err(|_| SessionError::InvalidTransition { from, to: target })?;
        self.updated_at = Timestamp::now();
        Ok(from)
    }
}

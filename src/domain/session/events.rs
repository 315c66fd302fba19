//! Session domain events.
//!
//! - `SessionCreated` - Session registered in storage
//! - `SessionStatusChanged` - Connectivity status moved
//! - `SessionEnded` - Session torn down and removed from storage

use serde::{Deserialize, Serialize};

use super::{ConnectivityStatus, Session};
use crate::domain::foundation::{
    domain_event, topics, EventId, Identity, ServiceId, SessionId, Timestamp,
};
use crate::domain::market::ServiceType;

// ════════════════════════════════════════════════════════════════════════════
// SessionCreated
// ════════════════════════════════════════════════════════════════════════════

/// Published when the session manager registers a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub consumer_id: Identity,
    pub provider_id: Identity,
    pub service_id: ServiceId,
    pub service_type: ServiceType,
    pub created_at: Timestamp,
}

domain_event!(
    SessionCreated,
    event_type = topics::SESSION_CREATED,
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = created_at,
    event_id = event_id
);

impl SessionCreated {
    pub fn from_session(session: &Session) -> Self {
        Self {
            event_id: EventId::new(),
            session_id: session.id(),
            consumer_id: session.consumer_id().clone(),
            provider_id: session.provider_id().clone(),
            service_id: session.service_id(),
            service_type: session.service_type(),
            created_at: session.created_at(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SessionStatusChanged
// ════════════════════════════════════════════════════════════════════════════

/// Published on every connectivity transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusChanged {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub from: ConnectivityStatus,
    pub to: ConnectivityStatus,
    pub changed_at: Timestamp,
}

domain_event!(
    SessionStatusChanged,
    event_type = topics::SESSION_STATUS_CHANGED,
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = changed_at,
    event_id = event_id
);

impl SessionStatusChanged {
    pub fn new(session_id: SessionId, from: ConnectivityStatus, to: ConnectivityStatus) -> Self {
        Self {
            event_id: EventId::new(),
            session_id,
            from,
            to,
            changed_at: Timestamp::now(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SessionEnded
// ════════════════════════════════════════════════════════════════════════════

/// Published after teardown removed the session from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEnded {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub consumer_id: Identity,
    pub service_id: ServiceId,
    pub final_status: ConnectivityStatus,
    pub ended_at: Timestamp,
}

domain_event!(
    SessionEnded,
    event_type = topics::SESSION_ENDED,
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = ended_at,
    event_id = event_id
);

impl SessionEnded {
    pub fn from_session(session: &Session) -> Self {
        Self {
            event_id: EventId::new(),
            session_id: session.id(),
            consumer_id: session.consumer_id().clone(),
            service_id: session.service_id(),
            final_status: session.status(),
            ended_at: Timestamp::now(),
        }
    }
}

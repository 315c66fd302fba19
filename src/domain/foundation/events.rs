//! Event infrastructure for node-wide publish/subscribe.
//!
//! - `EventId` - Unique identifier for events (deduplication)
//! - `EventMetadata` - Correlation context
//! - `EventEnvelope` - Transport wrapper for domain events
//! - `DomainEvent` - Trait that all domain events implement
//! - `domain_event!` - Macro to simplify DomainEvent implementations
//! - `topics` - Event type constants, one per event category

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::{DomainError, Timestamp};

/// Event type constants.
///
/// Subscribers register against these exact strings; publishers obtain them
/// through [`DomainEvent::event_type`].
pub mod topics {
    pub const SERVICE_STATUS_CHANGED: &str = "service.status_changed";

    pub const SESSION_CREATED: &str = "session.created";
    pub const SESSION_STATUS_CHANGED: &str = "session.status_changed";
    pub const SESSION_ENDED: &str = "session.ended";

    pub const PROMISE_RECEIVED: &str = "payment.promise_received";
    pub const PROMISE_REJECTED: &str = "payment.promise_rejected";

    pub const SETTLEMENT_REQUESTED: &str = "settlement.requested";
    pub const SETTLEMENT_COMPLETED: &str = "settlement.completed";
    pub const SETTLEMENT_TIMED_OUT: &str = "settlement.timed_out";
    pub const SETTLEMENT_FAILED: &str = "settlement.failed";

    pub const REGISTRATION_COMPLETED: &str = "registration.completed";
    pub const REGISTRATION_FAILED: &str = "registration.failed";
}

/// Trait that all domain events must implement.
pub trait DomainEvent: Send + Sync {
    /// Returns the event type string (one of [`topics`]).
    fn event_type(&self) -> &'static str;

    /// Returns the ID of the aggregate that emitted this event.
    fn aggregate_id(&self) -> String;

    /// Returns the type of aggregate (e.g., "Session", "Service").
    fn aggregate_type(&self) -> &'static str;

    /// Returns when the event occurred.
    fn occurred_at(&self) -> Timestamp;

    /// Returns the unique ID for this event instance.
    fn event_id(&self) -> EventId;
}

/// Macro to implement DomainEvent trait with minimal boilerplate.
///
/// # Example
///
/// ```ignore
/// domain_event!(
///     SessionCreated,
///     event_type = topics::SESSION_CREATED,
///     aggregate_id = session_id,
///     aggregate_type = "Session",
///     occurred_at = created_at,
///     event_id = event_id
/// );
/// ```
#[macro_export]
macro_rules! domain_event {
    (
        $event_name:ident,
        event_type = $event_type:expr,
        aggregate_id = $agg_id_field:ident,
        aggregate_type = $agg_type:expr,
        occurred_at = $occurred_field:ident,
        event_id = $event_id_field:ident
    ) => {
        impl $crate::domain::foundation::DomainEvent for $event_name {
            fn event_type(&self) -> &'static str {
                $event_type
            }

            fn aggregate_id(&self) -> String {
                self.$agg_id_field.to_string()
            }

            fn aggregate_type(&self) -> &'static str {
                $agg_type
            }

            fn occurred_at(&self) -> $crate::domain::foundation::Timestamp {
                self.$occurred_field
            }

            fn event_id(&self) -> $crate::domain::foundation::EventId {
                self.$event_id_field.clone()
            }
        }
    };
}

pub use domain_event;

/// Unique identifier for events (used for deduplication).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates a new random EventId using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation context that flows through the event system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// ID linking related events (e.g. all events of one session).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// ID of the event that directly caused this event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,
}

/// Transport envelope for domain events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique ID for this event instance.
    pub event_id: EventId,

    /// Event type for routing (one of [`topics`]).
    pub event_type: String,

    /// ID of the aggregate that emitted this event.
    pub aggregate_id: String,

    /// Type of aggregate (e.g., "Session", "Settlement").
    pub aggregate_type: String,

    /// When the event occurred.
    pub occurred_at: Timestamp,

    /// Event-specific payload as JSON.
    pub payload: JsonValue,

    /// Correlation metadata.
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    /// Creates a new EventEnvelope with required fields.
    pub fn new(
        event_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            occurred_at: Timestamp::now(),
            payload,
            metadata: EventMetadata::default(),
        }
    }

    /// Creates an envelope from a domain event, serializing it as the payload.
    pub fn from_event<T>(event: &T) -> Result<Self, DomainError>
    where
        T: DomainEvent + Serialize,
    {
        Ok(Self {
            event_id: event.event_id(),
            event_type: event.event_type().to_string(),
            aggregate_id: event.aggregate_id(),
            aggregate_type: event.aggregate_type().to_string(),
            occurred_at: event.occurred_at(),
            payload: serde_json::to_value(event)?,
            metadata: EventMetadata::default(),
        })
    }

    /// Add correlation ID.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(id.into());
        self
    }

    /// Add causation ID (ID of event that caused this one).
    pub fn with_causation_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.causation_id = Some(id.into());
        self
    }

    /// Deserialize payload to a specific event type.
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Pinged {
        event_id: EventId,
        target: String,
        at: Timestamp,
    }

    domain_event!(
        Pinged,
        event_type = "test.pinged",
        aggregate_id = target,
        aggregate_type = "Target",
        occurred_at = at,
        event_id = event_id
    );

    #[test]
    fn event_ids_are_unique() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn from_event_copies_routing_fields() {
        let event = Pinged {
            event_id: EventId::new(),
            target: "node-a".to_string(),
            at: Timestamp::from_unix_secs(10),
        };

        let envelope = EventEnvelope::from_event(&event).unwrap();

        assert_eq!(envelope.event_type, "test.pinged");
        assert_eq!(envelope.aggregate_id, "node-a");
        assert_eq!(envelope.aggregate_type, "Target");
        assert_eq!(envelope.event_id, event.event_id);
        assert_eq!(envelope.occurred_at, event.at);
    }

    #[test]
    fn payload_roundtrips() {
        let event = Pinged {
            event_id: EventId::new(),
            target: "node-b".to_string(),
            at: Timestamp::now(),
        };
        let envelope = EventEnvelope::from_event(&event).unwrap();

        let back: Pinged = envelope.payload_as().unwrap();
        assert_eq!(back.target, "node-b");
    }

    #[test]
    fn metadata_builders_set_fields() {
        let envelope = EventEnvelope::new("t", "a", "A", json!({}))
            .with_correlation_id("corr")
            .with_causation_id("cause");

        assert_eq!(envelope.metadata.correlation_id.as_deref(), Some("corr"));
        assert_eq!(envelope.metadata.causation_id.as_deref(), Some("cause"));
    }
}

//! Event publishing shared by handlers.

use serde::Serialize;
use tracing::warn;

use crate::domain::foundation::{DomainEvent, EventEnvelope};
use crate::ports::EventPublisher;

/// Publishes `event`, logging instead of failing the caller.
///
/// Every publisher in the node treats the bus as best effort: an event that
/// cannot be serialized or delivered never aborts the operation that raised it.
pub(crate) async fn publish_event<E>(publisher: &dyn EventPublisher, event: &E)
where
    E: DomainEvent + Serialize,
{
    let envelope = match EventEnvelope::from_event(event) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(event_type = event.event_type(), error = %e, "Event serialization failed");
            return;
        }
    };
    if let Err(e) = publisher.publish(envelope).await {
        warn!(event_type = event.event_type(), error = %e, "Event publish failed");
    }
}

//! EventSubscriber port - Interface for subscribing to node events.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Handler for processing node events.
///
/// Implementations should be:
/// - **Idempotent** - Safe to call multiple times with same event
/// - **Quick** - Long operations belong on a spawned task
///
/// # Example
///
/// ```ignore
/// struct ServiceCleaner { /* ... */ }
///
/// #[async_trait]
/// impl EventHandler for ServiceCleaner {
///     async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
///         let payload: ServiceStatusChanged = event.payload_as()?;
///         // Remove sessions of stopped services...
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "ServiceCleaner"
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Port for registering event handlers.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe a handler to a specific event type (one of `topics`).
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    /// Subscribe a handler to multiple event types.
    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>);
}

/// Combined publish/subscribe capability.
pub trait EventBus: super::EventPublisher + EventSubscriber {}

impl<T: super::EventPublisher + EventSubscriber> EventBus for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_handler_object_safe(_: &dyn EventHandler) {}

    #[allow(dead_code)]
    fn assert_subscriber_object_safe(_: &dyn EventSubscriber) {}

    #[allow(dead_code)]
    fn assert_bus_object_safe(_: &dyn EventBus) {}
}

//! In-process event bus.
//!
//! Every subscription gets its own queue and worker task, so handlers run
//! outside the publisher's call stack and see events in publish order.

use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

#[derive(Clone)]
struct Route {
    handler: &'static str,
    queue: mpsc::UnboundedSender<EventEnvelope>,
}

type IdleWorker = (Arc<dyn EventHandler>, mpsc::UnboundedReceiver<EventEnvelope>);

/// Counts deliveries that were queued but not yet handled.
#[derive(Default)]
struct Deliveries {
    pending: AtomicUsize,
    settled: Notify,
}

impl Deliveries {
    fn begin(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.settled.notify_waiters();
        }
    }
}

/// In-memory event bus shared by all node components.
///
/// Features:
/// - Asynchronous, ordered delivery per subscription
/// - Event capture for assertions, off for [`InMemoryEventBus::without_capture`]
/// - `drain` to wait for outstanding deliveries
/// - `close` to stop every worker
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.subscribe(topics::SESSION_CREATED, handler);
///
/// bus.publish(envelope).await?;
/// bus.drain().await;
/// assert!(bus.has_event(topics::SESSION_CREATED));
/// ```
pub struct InMemoryEventBus {
    routes: RwLock<HashMap<String, Vec<Route>>>,
    idle: Mutex<Vec<IdleWorker>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    published: RwLock<Vec<EventEnvelope>>,
    capture: bool,
    deliveries: Arc<Deliveries>,
}

impl InMemoryEventBus {
    /// Creates a new empty event bus that keeps every published event.
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            idle: Mutex::new(Vec::new()),
            workers: Mutex::new(Vec::new()),
            published: RwLock::new(Vec::new()),
            capture: true,
            deliveries: Arc::new(Deliveries::default()),
        }
    }

    /// Bus for long-running nodes: events are delivered but not kept, so
    /// the capture helpers below always see nothing.
    pub fn without_capture() -> Self {
        Self {
            capture: false,
            ..Self::new()
        }
    }

    /// Waits until every queued delivery has been handled, including events
    /// published by handlers in the meantime.
    pub async fn drain(&self) {
        loop {
            let settled = self.deliveries.settled.notified();
            tokio::pin!(settled);
            settled.as_mut().enable();
            if self.deliveries.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            settled.await;
        }
    }

    /// Drops all subscriptions and waits for workers to finish queued events.
    pub async fn close(&self) {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).clear();

        let workers: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Event worker ended abnormally");
            }
        }
    }

    // === Test Helpers ===

    /// Returns all published events.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns events of a specific type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Returns events for a specific aggregate.
    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .collect()
    }

    /// Clears all captured events.
    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns count of published events.
    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Checks if a specific event type was published.
    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e.event_type == event_type)
    }

    fn add_subscription(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        let (queue, inbox) = mpsc::unbounded_channel();
        let route = Route {
            handler: handler.name(),
            queue,
        };
        {
            let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
            for event_type in event_types {
                routes
                    .entry(event_type.to_string())
                    .or_default()
                    .push(route.clone());
            }
        }
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((handler, inbox));
    }

    /// Spawns workers for subscriptions made since the last publish.
    fn start_idle_workers(&self) {
        let idle: Vec<IdleWorker> =
            std::mem::take(&mut *self.idle.lock().unwrap_or_else(PoisonError::into_inner));
        if idle.is_empty() {
            return;
        }
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        for (handler, inbox) in idle {
            let deliveries = Arc::clone(&self.deliveries);
            workers.push(tokio::spawn(run_worker(handler, inbox, deliveries)));
        }
    }
}

async fn run_worker(
    handler: Arc<dyn EventHandler>,
    mut inbox: mpsc::UnboundedReceiver<EventEnvelope>,
    deliveries: Arc<Deliveries>,
) {
    while let Some(event) = inbox.recv().await {
        let outcome = AssertUnwindSafe(handler.handle(event.clone()))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                handler = handler.name(),
                event_type = %event.event_type,
                event_id = %event.event_id,
                error = %e,
                "Event handler failed"
            ),
            Err(_) => warn!(
                handler = handler.name(),
                event_type = %event.event_type,
                "Event handler panicked"
            ),
        }
        deliveries.finish();
    }
    debug!(handler = handler.name(), "Event worker stopped");
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if self.capture {
            self.published
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        }

        self.start_idle_workers();

        let routes: Vec<Route> = self
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        for route in routes {
            self.deliveries.begin();
            if route.queue.send(event.clone()).is_err() {
                self.deliveries.finish();
                warn!(
                    handler = route.handler,
                    event_type = %event.event_type,
                    "Subscriber gone, event dropped"
                );
            }
        }

        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.add_subscription(&[event_type], handler);
    }

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        self.add_subscription(event_types, handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ErrorCode, EventId, EventMetadata, Timestamp};
    use serde_json::json;
    use std::sync::atomic::AtomicBool;

    fn test_envelope(event_type: &str, aggregate_id: &str) -> EventEnvelope {
        EventEnvelope {
            event_id: EventId::new(),
            event_type: event_type.to_string(),
            aggregate_id: aggregate_id.to_string(),
            aggregate_type: "Test".to_string(),
            occurred_at: Timestamp::now(),
            payload: json!({}),
            metadata: EventMetadata::default(),
        }
    }

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &'static str {
            "CountingHandler"
        }
    }

    #[tokio::test]
    async fn publish_stores_event() {
        let bus = InMemoryEventBus::new();

        bus.publish(test_envelope("test.event", "agg-1")).await.unwrap();

        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event("test.event"));
    }

    #[tokio::test]
    async fn events_filters_work() {
        let bus = InMemoryEventBus::new();

        bus.publish(test_envelope("type.a", "agg-1")).await.unwrap();
        bus.publish(test_envelope("type.b", "agg-2")).await.unwrap();
        bus.publish(test_envelope("type.a", "agg-1")).await.unwrap();

        assert_eq!(bus.events_of_type("type.a").len(), 2);
        assert_eq!(bus.events_for_aggregate("agg-2").len(), 1);

        bus.clear();
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn bus_without_capture_delivers_but_keeps_nothing() {
        let bus = InMemoryEventBus::without_capture();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe("test.event", Arc::new(CountingHandler(counter.clone())));

        for i in 0..1000 {
            bus.publish(test_envelope("test.event", &i.to_string()))
                .await
                .unwrap();
        }
        bus.drain().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1000);
        assert_eq!(bus.event_count(), 0);
        assert!(bus.published_events().is_empty());
    }

    #[tokio::test]
    async fn handler_receives_published_event() {
        let bus = InMemoryEventBus::new();
        let received = Arc::new(AtomicBool::new(false));

        struct FlagHandler(Arc<AtomicBool>);

        #[async_trait]
        impl EventHandler for FlagHandler {
            async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
                self.0.store(true, Ordering::SeqCst);
                Ok(())
            }
            fn name(&self) -> &'static str {
                "FlagHandler"
            }
        }

        bus.subscribe("test.event", Arc::new(FlagHandler(received.clone())));
        bus.publish(test_envelope("test.event", "1")).await.unwrap();
        bus.drain().await;

        assert!(received.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn multiple_handlers_all_invoked() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            bus.subscribe("test.event", Arc::new(CountingHandler(counter.clone())));
        }

        bus.publish(test_envelope("test.event", "1")).await.unwrap();
        bus.drain().await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn subscribe_all_registers_for_multiple_types() {
        let bus = InMemoryEventBus::new();
        let received = Arc::new(AtomicUsize::new(0));

        bus.subscribe_all(
            &["type.a", "type.b", "type.c"],
            Arc::new(CountingHandler(received.clone())),
        );

        bus.publish(test_envelope("type.a", "1")).await.unwrap();
        bus.publish(test_envelope("type.b", "2")).await.unwrap();
        bus.publish(test_envelope("type.d", "3")).await.unwrap();
        bus.drain().await;

        assert_eq!(received.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn handler_sees_events_in_publish_order() {
        let bus = InMemoryEventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        struct RecordingHandler(Arc<Mutex<Vec<String>>>);

        #[async_trait]
        impl EventHandler for RecordingHandler {
            async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
                tokio::task::yield_now().await;
                self.0.lock().unwrap().push(event.aggregate_id);
                Ok(())
            }
            fn name(&self) -> &'static str {
                "RecordingHandler"
            }
        }

        bus.subscribe("test.event", Arc::new(RecordingHandler(seen.clone())));
        for i in 0..20 {
            bus.publish(test_envelope("test.event", &i.to_string()))
                .await
                .unwrap();
        }
        bus.drain().await;

        let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(*seen.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn handler_error_does_not_fail_publish() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        struct FailingHandler;

        #[async_trait]
        impl EventHandler for FailingHandler {
            async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
                Err(DomainError::new(ErrorCode::InternalError, "Handler failed"))
            }
            fn name(&self) -> &'static str {
                "FailingHandler"
            }
        }

        bus.subscribe("test.event", Arc::new(FailingHandler));
        bus.subscribe("test.event", Arc::new(CountingHandler(counter.clone())));

        let result = bus.publish(test_envelope("test.event", "1")).await;
        bus.drain().await;

        assert!(result.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drain_waits_for_events_published_by_handlers() {
        let bus = Arc::new(InMemoryEventBus::new());
        let counter = Arc::new(AtomicUsize::new(0));

        struct Relay(Arc<InMemoryEventBus>);

        #[async_trait]
        impl EventHandler for Relay {
            async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
                self.0.publish(test_envelope("second", "1")).await
            }
            fn name(&self) -> &'static str {
                "Relay"
            }
        }

        bus.subscribe("first", Arc::new(Relay(bus.clone())));
        bus.subscribe("second", Arc::new(CountingHandler(counter.clone())));

        bus.publish(test_envelope("first", "1")).await.unwrap();
        bus.drain().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_finishes_queued_events() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe("test.event", Arc::new(CountingHandler(counter.clone())));

        bus.publish(test_envelope("test.event", "1")).await.unwrap();
        bus.publish(test_envelope("test.event", "2")).await.unwrap();
        bus.close().await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);

        bus.publish(test_envelope("test.event", "3")).await.unwrap();
        bus.drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}

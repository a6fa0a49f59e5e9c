//! In-memory event bus.
//!
//! Captures every published envelope for assertions. Used by tests and by
//! development wiring that wants to inspect emitted events.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

/// In-memory event bus.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.publish(envelope).await?;
/// assert!(bus.has_event("subscription.created"));
/// ```
#[derive(Default)]
pub struct InMemoryEventBus {
    published: RwLock<Vec<EventEnvelope>>,
    failing: AtomicBool,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent publish fail without recording the event.
    pub fn fail_publishes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    // === Test Helpers ===

    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e.event_type == event_type)
    }

    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("event bus rejected {}", event.event_type),
            ));
        }

        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str, aggregate_id: &str) -> EventEnvelope {
        EventEnvelope::new(event_type, aggregate_id, "Subscription", json!({}))
    }

    #[tokio::test]
    async fn publish_captures_events_in_order() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("subscription.created", "s1")).await.unwrap();
        bus.publish(envelope("subscription.renewed", "s1")).await.unwrap();

        let events = bus.published_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "subscription.created");
        assert_eq!(events[1].event_type, "subscription.renewed");
    }

    #[tokio::test]
    async fn filters_by_type_and_aggregate() {
        let bus = InMemoryEventBus::new();
        bus.publish_all(vec![
            envelope("subscription.created", "s1"),
            envelope("subscription.created", "s2"),
            envelope("subscription.renewed", "s1"),
        ])
        .await
        .unwrap();

        assert_eq!(bus.events_of_type("subscription.created").len(), 2);
        assert_eq!(bus.events_for_aggregate("s1").len(), 2);
        assert!(bus.has_event("subscription.renewed"));
        assert!(!bus.has_event("subscription.status_changed"));
    }

    #[tokio::test]
    async fn failing_bus_records_nothing() {
        let bus = InMemoryEventBus::new();
        bus.fail_publishes(true);

        let result = bus.publish(envelope("subscription.created", "s1")).await;

        assert!(result.is_err());
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn clear_removes_events() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("subscription.created", "s1")).await.unwrap();
        bus.clear();
        assert_eq!(bus.event_count(), 0);
    }
}

//! EventPublisher port - Interface for publishing domain events.
//!
//! Publishing is at-most-once and fire-and-forget from the caller's point of
//! view: application services log publish errors and carry on.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// One publisher is wired per domain (entitlement, subscription, dunning);
/// they may share an implementation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish multiple events in order, stopping at the first failure.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

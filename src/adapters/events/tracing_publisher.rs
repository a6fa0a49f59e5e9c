//! Event publisher that writes envelopes to the log.
//!
//! Used when no message broker is configured.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

pub struct TracingEventPublisher {
    channel: &'static str,
}

impl TracingEventPublisher {
    /// Creates a publisher that tags its log lines with `channel`
    /// (e.g. "dunning").
    pub fn new(channel: &'static str) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        tracing::info!(
            channel = self.channel,
            event_id = %event.event_id,
            event_type = %event.event_type,
            aggregate_type = %event.aggregate_type,
            aggregate_id = %event.aggregate_id,
            payload = %event.payload,
            "domain event published"
        );
        Ok(())
    }
}

//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, error types and event infrastructure
//! that form the vocabulary of the billing authorization domain.

mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, StatusClass, ValidationError};
pub use events::{
    DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent,
};
pub use ids::{DunningEventId, EntitlementId, PaymentId, PlanId, SubscriptionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;

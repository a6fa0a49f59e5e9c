//! Adapters - Implementations of port interfaces.
//!
//! - `cache` - Entitlement caches (in-memory, Redis)
//! - `events` - Event publishers (in-memory bus, tracing)
//! - `memory` - In-memory repositories
//! - `payments` - Payment provider stand-ins

pub mod cache;
pub mod events;
pub mod memory;
pub mod payments;

pub use cache::{InMemoryEntitlementCache, RedisEntitlementCache};
pub use events::{InMemoryEventBus, TracingEventPublisher};
pub use memory::{
    InMemoryDunningEventRepository, InMemoryEntitlementRepository, InMemoryPaymentRepository,
    InMemorySubscriptionRepository,
};
pub use payments::StubPaymentRetrier;

//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Stores
//!
//! - `EntitlementRepository` - Durable entitlement grants
//! - `SubscriptionRepository` - Subscriptions, version-checked updates
//! - `PaymentRepository` - Payment status and metadata
//! - `DunningEventRepository` - Dunning cycles, version-checked updates
//!
//! ## Infrastructure
//!
//! - `EntitlementCache` - TTL cache with negative entries
//! - `EventPublisher` - Domain event fan-out
//! - `PaymentRetrier` - Charge retries at the payment provider

mod dunning_event_repository;
mod entitlement_cache;
mod entitlement_repository;
mod event_publisher;
mod payment_repository;
mod payment_retrier;
mod subscription_repository;

pub use dunning_event_repository::DunningEventRepository;
pub use entitlement_cache::{entitlement_cache_key, CacheError, CacheLookup, EntitlementCache};
pub use entitlement_repository::EntitlementRepository;
pub use event_publisher::EventPublisher;
pub use payment_repository::PaymentRepository;
pub use payment_retrier::{PaymentRetrier, RetryOutcome};
pub use subscription_repository::SubscriptionRepository;

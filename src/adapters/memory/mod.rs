//! In-memory repositories.
//!
//! Back the ports with `tokio::sync::RwLock`-guarded maps. Used by tests and
//! by the development binary; they honour the same version checks as a
//! durable store would.

mod dunning_event_repository;
mod entitlement_repository;
mod payment_repository;
mod subscription_repository;

pub use dunning_event_repository::InMemoryDunningEventRepository;
pub use entitlement_repository::InMemoryEntitlementRepository;
pub use payment_repository::InMemoryPaymentRepository;
pub use subscription_repository::InMemorySubscriptionRepository;

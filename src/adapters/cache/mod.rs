//! Entitlement cache implementations.
//!
//! - `InMemoryEntitlementCache` - single-process cache for tests and development
//! - `RedisEntitlementCache` - shared cache for multi-instance deployments

mod in_memory;
mod redis;

pub use self::redis::RedisEntitlementCache;
pub use in_memory::InMemoryEntitlementCache;

//! Entitlement cache port.
//!
//! A TTL key/value cache in front of the entitlement repository. Besides
//! positive entries it stores negative markers recording that a lookup
//! found nothing usable, so repeated denials skip the repository.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::entitlement::Entitlement;
use crate::domain::foundation::UserId;

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Entitlement),
    NegativeHit,
    Miss,
}

/// Errors raised by cache backends.
///
/// Callers treat every variant as a miss after logging it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache entry could not be decoded: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait EntitlementCache: Send + Sync {
    async fn get(&self, user_id: &UserId, feature_code: &str) -> Result<CacheLookup, CacheError>;

    async fn set(&self, entitlement: &Entitlement, ttl: Duration) -> Result<(), CacheError>;

    async fn set_negative(
        &self,
        user_id: &UserId,
        feature_code: &str,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Removes any entry, positive or negative, for (user, feature).
    async fn delete(&self, user_id: &UserId, feature_code: &str) -> Result<(), CacheError>;
}

/// Builds the cache key `entl:{user}:{feature}` for (user, feature).
///
/// `%` and `:` inside either part are percent-escaped, so distinct pairs
/// never share a key.
pub fn entitlement_cache_key(user_id: &UserId, feature_code: &str) -> String {
    format!(
        "entl:{}:{}",
        escape_key_part(user_id.as_str()),
        escape_key_part(feature_code)
    )
}

fn escape_key_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            _ => escaped.push(c),
        }
    }
    escaped
}

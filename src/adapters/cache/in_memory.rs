//! In-memory entitlement cache.
//!
//! Entries expire lazily: an expired entry is dropped when it is next read.
//! A TTL too large for the clock never expires.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::domain::entitlement::Entitlement;
use crate::domain::foundation::UserId;
use crate::ports::{entitlement_cache_key, CacheError, CacheLookup, EntitlementCache};

#[derive(Debug, Clone)]
enum Slot {
    Positive(Entitlement),
    Negative,
}

#[derive(Debug, Clone)]
struct Entry {
    slot: Slot,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEntitlementCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryEntitlementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries (expired entries not yet read are excluded).
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn put(&self, key: String, slot: Slot, ttl: Duration) {
        let entry = Entry {
            slot,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.write().await.insert(key, entry);
    }
}

#[async_trait]
impl EntitlementCache for InMemoryEntitlementCache {
    async fn get(&self, user_id: &UserId, feature_code: &str) -> Result<CacheLookup, CacheError> {
        let key = entitlement_cache_key(user_id, feature_code);
        let now = Instant::now();

        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                None => return Ok(CacheLookup::Miss),
                Some(entry) if entry.is_live(now) => {
                    return Ok(match &entry.slot {
                        Slot::Positive(entitlement) => CacheLookup::Hit(entitlement.clone()),
                        Slot::Negative => CacheLookup::NegativeHit,
                    });
                }
                Some(_) => {}
            }
        }

        // Expired: drop it unless it was refreshed in between.
        let mut entries = self.entries.write().await;
        if entries.get(&key).map_or(false, |entry| !entry.is_live(now)) {
            entries.remove(&key);
        }
        Ok(CacheLookup::Miss)
    }

    async fn set(&self, entitlement: &Entitlement, ttl: Duration) -> Result<(), CacheError> {
        let key = entitlement_cache_key(&entitlement.user_id, &entitlement.feature_code);
        self.put(key, Slot::Positive(entitlement.clone()), ttl).await;
        Ok(())
    }

    async fn set_negative(
        &self,
        user_id: &UserId,
        feature_code: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = entitlement_cache_key(user_id, feature_code);
        self.put(key, Slot::Negative, ttl).await;
        Ok(())
    }

    async fn delete(&self, user_id: &UserId, feature_code: &str) -> Result<(), CacheError> {
        let key = entitlement_cache_key(user_id, feature_code);
        self.entries.write().await.remove(&key);
        Ok(())
    }
}

//! Redis-backed entitlement cache for multi-instance deployments.
//!
//! Values are JSON documents tagged `positive` (carrying the entitlement) or
//! `negative`. Entries are written with `SET .. EX` and removed with `DEL`.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::entitlement::Entitlement;
use crate::domain::foundation::UserId;
use crate::ports::{entitlement_cache_key, CacheError, CacheLookup, EntitlementCache};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum CachedValue {
    Positive { entitlement: Entitlement },
    Negative,
}

#[derive(Clone)]
pub struct RedisEntitlementCache {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisEntitlementCache {
    pub fn new(conn: MultiplexedConnection, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Opens a multiplexed connection to `url`, giving up after `timeout`.
    pub async fn connect(
        url: &str,
        key_prefix: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = tokio::time::timeout(timeout, client.get_multiplexed_tokio_connection())
            .await
            .map_err(|_| CacheError::Unavailable(format!("connect timed out after {:?}", timeout)))?
            .map_err(unavailable)?;
        Ok(Self::new(conn, key_prefix))
    }

    fn key(&self, user_id: &UserId, feature_code: &str) -> String {
        format!("{}{}", self.key_prefix, entitlement_cache_key(user_id, feature_code))
    }

    async fn put(&self, key: String, value: &CachedValue, ttl: Duration) -> Result<(), CacheError> {
        let payload =
            serde_json::to_string(value).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        // Redis rejects EX 0
        let secs = ttl.as_secs().max(1);

        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(&key)
            .arg(payload)
            .arg("EX")
            .arg(secs)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }
}

fn unavailable(e: redis::RedisError) -> CacheError {
    CacheError::Unavailable(e.to_string())
}

fn decode(raw: Option<String>) -> Result<CacheLookup, CacheError> {
    let Some(raw) = raw else {
        return Ok(CacheLookup::Miss);
    };
    match serde_json::from_str::<CachedValue>(&raw) {
        Ok(CachedValue::Positive { entitlement }) => Ok(CacheLookup::Hit(entitlement)),
        Ok(CachedValue::Negative) => Ok(CacheLookup::NegativeHit),
        Err(e) => Err(CacheError::Corrupt(e.to_string())),
    }
}

#[async_trait]
impl EntitlementCache for RedisEntitlementCache {
    async fn get(&self, user_id: &UserId, feature_code: &str) -> Result<CacheLookup, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(self.key(user_id, feature_code))
            .await
            .map_err(unavailable)?;
        decode(raw)
    }

    async fn set(&self, entitlement: &Entitlement, ttl: Duration) -> Result<(), CacheError> {
        let key = self.key(&entitlement.user_id, &entitlement.feature_code);
        let value = CachedValue::Positive {
            entitlement: entitlement.clone(),
        };
        self.put(key, &value, ttl).await
    }

    async fn set_negative(
        &self,
        user_id: &UserId,
        feature_code: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.put(self.key(user_id, feature_code), &CachedValue::Negative, ttl)
            .await
    }

    async fn delete(&self, user_id: &UserId, feature_code: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.key(user_id, feature_code))
            .await
            .map_err(unavailable)
    }
}

impl std::fmt::Debug for RedisEntitlementCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEntitlementCache")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

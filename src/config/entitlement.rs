//! Entitlement engine configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Hard ceiling on the bulk batch size that configuration may raise the limit to.
const BULK_BATCH_CEILING: usize = 1000;

/// Cache TTLs and bulk-check limits for the entitlement engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EntitlementConfig {
    /// TTL of positive cache entries
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// TTL of negative cache entries
    #[serde(default = "default_negative_cache_ttl")]
    pub negative_cache_ttl_secs: u64,

    /// Maximum number of checks in one bulk request
    #[serde(default = "default_bulk_max_batch")]
    pub bulk_max_batch: usize,

    /// Maximum number of checks in flight at once during a bulk request
    #[serde(default = "default_bulk_concurrency")]
    pub bulk_concurrency: usize,

    /// Base of the upgrade link attached to denied checks
    #[serde(default = "default_upgrade_url_base")]
    pub upgrade_url_base: String,
}

impl EntitlementConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn negative_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.negative_cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cache_ttl_secs == 0 {
            return Err(ValidationError::MustBePositive("entitlements.cache_ttl_secs"));
        }
        if self.negative_cache_ttl_secs == 0 {
            return Err(ValidationError::MustBePositive(
                "entitlements.negative_cache_ttl_secs",
            ));
        }
        if self.bulk_max_batch == 0 || self.bulk_max_batch > BULK_BATCH_CEILING {
            return Err(ValidationError::InvalidBatchSize {
                max: BULK_BATCH_CEILING,
                actual: self.bulk_max_batch,
            });
        }
        if self.bulk_concurrency == 0 {
            return Err(ValidationError::MustBePositive("entitlements.bulk_concurrency"));
        }
        if !self.upgrade_url_base.starts_with("http://")
            && !self.upgrade_url_base.starts_with("https://")
        {
            return Err(ValidationError::InvalidUpgradeUrl);
        }
        Ok(())
    }
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            negative_cache_ttl_secs: default_negative_cache_ttl(),
            bulk_max_batch: default_bulk_max_batch(),
            bulk_concurrency: default_bulk_concurrency(),
            upgrade_url_base: default_upgrade_url_base(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    120
}

fn default_negative_cache_ttl() -> u64 {
    10
}

fn default_bulk_max_batch() -> usize {
    100
}

fn default_bulk_concurrency() -> usize {
    10
}

fn default_upgrade_url_base() -> String {
    "https://app.example.com/checkout".to_string()
}

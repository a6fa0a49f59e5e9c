//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `BILLING_AUTHZ` prefix and
//! `__` between nesting levels. Every section has defaults, so an empty
//! environment yields a runnable development configuration.
//!
//! # Example
//!
//! ```no_run
//! use billing_authz::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod dunning;
mod entitlement;
mod error;
mod logging;
mod redis;

pub use dunning::DunningConfig;
pub use entitlement::EntitlementConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use redis::RedisConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Redis for the entitlement cache; the in-memory cache is used when absent
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    #[serde(default)]
    pub entitlements: EntitlementConfig,

    #[serde(default)]
    pub dunning: DunningConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `BILLING_AUTHZ` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `BILLING_AUTHZ__REDIS__URL=redis://...` -> `redis.url`
    /// - `BILLING_AUTHZ__ENTITLEMENTS__CACHE_TTL_SECS=300` -> `entitlements.cache_ttl_secs`
    /// - `BILLING_AUTHZ__DUNNING__RETRY_INTERVALS_SECS=3600,86400` -> `dunning.retry_intervals_secs`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("BILLING_AUTHZ")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("dunning.retry_intervals_secs"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(redis) = &self.redis {
            redis.validate()?;
        }
        self.entitlements.validate()?;
        self.dunning.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 6] = [
        "BILLING_AUTHZ__REDIS__URL",
        "BILLING_AUTHZ__REDIS__KEY_PREFIX",
        "BILLING_AUTHZ__ENTITLEMENTS__CACHE_TTL_SECS",
        "BILLING_AUTHZ__DUNNING__RETRY_INTERVALS_SECS",
        "BILLING_AUTHZ__LOGGING__LEVEL",
        "BILLING_AUTHZ__LOGGING__JSON",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn empty_environment_yields_valid_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert!(config.redis.is_none());
        assert_eq!(config.entitlements.cache_ttl_secs, 120);
        assert_eq!(config.dunning.retry_intervals_secs, vec![3_600, 86_400, 259_200]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_values_are_read_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("BILLING_AUTHZ__REDIS__URL", "redis://localhost:6379");
        env::set_var("BILLING_AUTHZ__REDIS__KEY_PREFIX", "billing:");
        env::set_var("BILLING_AUTHZ__ENTITLEMENTS__CACHE_TTL_SECS", "300");
        env::set_var("BILLING_AUTHZ__LOGGING__JSON", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        let redis = config.redis.clone().unwrap();
        assert_eq!(redis.url, "redis://localhost:6379");
        assert_eq!(redis.key_prefix, "billing:");
        assert_eq!(redis.pool_size, 10);
        assert_eq!(config.entitlements.cache_ttl_secs, 300);
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn retry_ladder_parses_from_comma_list() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("BILLING_AUTHZ__DUNNING__RETRY_INTERVALS_SECS", "60,600");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.dunning.retry_intervals_secs, vec![60, 600]);
        assert_eq!(config.dunning.retry_policy().max_attempts(), 2);
    }

    #[test]
    fn validate_reports_bad_section() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("BILLING_AUTHZ__LOGGING__LEVEL", "loud");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidLogLevel("loud".to_string()))
        );
    }
}

//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool size must be between 1 and 100")]
    InvalidPoolSize,

    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("Bulk batch size must be between 1 and {max}, got {actual}")]
    InvalidBatchSize { max: usize, actual: usize },

    #[error("Upgrade URL base must be an http(s) URL")]
    InvalidUpgradeUrl,

    #[error("At least one dunning retry interval is required")]
    EmptyRetryLadder,

    #[error("Unknown log level: {0}")]
    InvalidLogLevel(String),
}

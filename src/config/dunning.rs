//! Dunning configuration

use serde::Deserialize;
use std::time::Duration;

use crate::domain::dunning::RetryPolicy;

use super::error::ValidationError;

/// Retry ladder and scheduler settings for dunning.
#[derive(Debug, Clone, Deserialize)]
pub struct DunningConfig {
    /// Delay before each retry, in seconds. Its length is the retry budget.
    #[serde(default = "default_retry_intervals")]
    pub retry_intervals_secs: Vec<u64>,

    #[serde(default = "default_escalation_delay")]
    pub escalation_delay_secs: u64,

    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    /// How often the scheduler looks for due retries
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// Maximum due events processed per scan
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,
}

impl DunningConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_intervals_secs
                .iter()
                .map(|secs| Duration::from_secs(*secs))
                .collect(),
            Duration::from_secs(self.escalation_delay_secs),
            Duration::from_secs(self.grace_period_secs),
        )
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.retry_intervals_secs.is_empty() {
            return Err(ValidationError::EmptyRetryLadder);
        }
        if self.retry_intervals_secs.iter().any(|secs| *secs == 0) {
            return Err(ValidationError::MustBePositive("dunning.retry_intervals_secs"));
        }
        if self.scan_interval_secs == 0 {
            return Err(ValidationError::MustBePositive("dunning.scan_interval_secs"));
        }
        if self.scan_batch_size == 0 {
            return Err(ValidationError::MustBePositive("dunning.scan_batch_size"));
        }
        Ok(())
    }
}

impl Default for DunningConfig {
    fn default() -> Self {
        Self {
            retry_intervals_secs: default_retry_intervals(),
            escalation_delay_secs: default_escalation_delay(),
            grace_period_secs: default_grace_period(),
            scan_interval_secs: default_scan_interval(),
            scan_batch_size: default_scan_batch_size(),
        }
    }
}

fn default_retry_intervals() -> Vec<u64> {
    vec![3_600, 86_400, 259_200]
}

fn default_escalation_delay() -> u64 {
    7 * 86_400
}

fn default_grace_period() -> u64 {
    86_400
}

fn default_scan_interval() -> u64 {
    60
}

fn default_scan_batch_size() -> usize {
    100
}

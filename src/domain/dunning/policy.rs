//! Retry ladder for dunning cycles.

use std::time::Duration;

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

/// Retry schedule derived from dunning configuration.
///
/// The number of intervals is the maximum number of retry attempts.
/// `escalation_delay` and `grace_period` are carried for reporting; the
/// ladder itself is the only thing enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    intervals: Vec<Duration>,
    pub escalation_delay: Duration,
    pub grace_period: Duration,
}

impl RetryPolicy {
    pub fn new(
        intervals: Vec<Duration>,
        escalation_delay: Duration,
        grace_period: Duration,
    ) -> Self {
        Self {
            intervals,
            escalation_delay,
            grace_period,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.intervals.len() as u32
    }

    /// Delay before the retry that follows `retry_count` completed attempts.
    ///
    /// `None` once the ladder is exhausted.
    pub fn delay_for(&self, retry_count: u32) -> Option<Duration> {
        self.intervals.get(retry_count as usize).copied()
    }

    pub fn intervals(&self) -> &[Duration] {
        &self.intervals
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            vec![
                Duration::from_secs(HOUR),
                Duration::from_secs(DAY),
                Duration::from_secs(3 * DAY),
            ],
            Duration::from_secs(7 * DAY),
            Duration::from_secs(DAY),
        )
    }
}

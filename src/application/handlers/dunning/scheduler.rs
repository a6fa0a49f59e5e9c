//! DunningScheduler - background loop that executes due retries.
//!
//! Each tick loads the active events whose `next_retry_at` has passed and,
//! for each, counts the attempt, asks the payment provider to retry, and
//! records the outcome. The attempt is applied to the version the scan
//! observed, so an event a manual retry touched in between is skipped until
//! the next tick.
//!
//! ## Graceful Shutdown
//!
//! The loop watches a shutdown channel and exits after the tick in progress.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::config::DunningConfig;
use crate::domain::dunning::{DunningEvent, DunningStatus};
use crate::domain::foundation::{DomainError, StatusClass, Timestamp};
use crate::ports::{PaymentRetrier, RetryOutcome};

use super::DunningManager;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub resolved: usize,
    pub rescheduled: usize,
    pub escalated: usize,

    /// Events another writer changed first.
    pub skipped: usize,
    pub failed: usize,
}

pub struct DunningScheduler {
    manager: Arc<DunningManager>,
    retrier: Arc<dyn PaymentRetrier>,
    scan_interval: Duration,
    batch_size: usize,
}

impl DunningScheduler {
    pub fn new(
        manager: Arc<DunningManager>,
        retrier: Arc<dyn PaymentRetrier>,
        config: &DunningConfig,
    ) -> Self {
        Self {
            manager,
            retrier,
            scan_interval: config.scan_interval(),
            batch_size: config.scan_batch_size,
        }
    }

    /// Runs until `shutdown` turns true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.scan_interval);
        info!(scan_interval_secs = self.scan_interval.as_secs(), "dunning scheduler started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("dunning scheduler stopping");
                        return;
                    }
                }
                _ = interval.tick() => {
                    if let Err(err) = self.tick().await {
                        error!(error = %err, "dunning scan failed");
                    }
                }
            }
        }
    }

    /// Processes every event due now, up to the batch size.
    pub async fn tick(&self) -> Result<TickReport, DomainError> {
        let due = self.manager.due_events(Timestamp::now(), self.batch_size).await?;
        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };

        for event in &due {
            match self.process(event).await {
                Ok(updated) => match updated.status {
                    DunningStatus::Resolved => report.resolved += 1,
                    DunningStatus::Escalated => report.escalated += 1,
                    _ => report.rescheduled += 1,
                },
                Err(err)
                    if matches!(
                        err.status(),
                        StatusClass::Aborted | StatusClass::FailedPrecondition
                    ) =>
                {
                    debug!(
                        dunning_event_id = %event.id,
                        error = %err,
                        "skipping changed dunning event"
                    );
                    report.skipped += 1;
                }
                Err(err) => {
                    error!(dunning_event_id = %event.id, error = %err, "scheduled retry failed");
                    report.failed += 1;
                }
            }
        }

        debug!(
            due = report.due,
            resolved = report.resolved,
            rescheduled = report.rescheduled,
            escalated = report.escalated,
            skipped = report.skipped,
            "dunning scan finished"
        );
        Ok(report)
    }

    async fn process(&self, scanned: &DunningEvent) -> Result<DunningEvent, DomainError> {
        let attempted = self.manager.attempt_scheduled(scanned).await?;

        let outcome = match self.retrier.retry(&attempted).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    dunning_event_id = %attempted.id,
                    error = %err,
                    "payment provider unavailable"
                );
                RetryOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };

        match outcome {
            RetryOutcome::Succeeded => {
                self.manager
                    .process_retry_result(&attempted.id, true, None)
                    .await
            }
            RetryOutcome::Failed { reason } => {
                self.manager
                    .process_retry_result(&attempted.id, false, Some(&reason))
                    .await
            }
        }
    }
}

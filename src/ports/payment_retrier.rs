//! Payment retrier port - re-attempts a failed charge at the payment provider.

use async_trait::async_trait;

use crate::domain::dunning::DunningEvent;
use crate::domain::foundation::DomainError;

/// What the provider reported for a retried charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Succeeded,
    Failed { reason: String },
}

#[async_trait]
pub trait PaymentRetrier: Send + Sync {
    /// Retries the payment behind `event`.
    ///
    /// An `Err` means the provider could not be asked at all; callers treat
    /// it as a failed retry.
    async fn retry(&self, event: &DunningEvent) -> Result<RetryOutcome, DomainError>;
}

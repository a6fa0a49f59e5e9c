//! Scripted PaymentRetrier for development and testing.
//!
//! Replays a queue of outcomes in order, then falls back to a fixed outcome.
//! Replace with a provider-backed retrier in production.
//!
//! ```ignore
//! let retrier = StubPaymentRetrier::always_failing("card_declined")
//!     .then(RetryOutcome::Succeeded);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::domain::dunning::DunningEvent;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{PaymentRetrier, RetryOutcome};

#[derive(Debug, Clone)]
enum Step {
    Outcome(RetryOutcome),
    ProviderDown(String),
}

#[derive(Debug)]
pub struct StubPaymentRetrier {
    script: Mutex<VecDeque<Step>>,
    fallback: RetryOutcome,
    calls: AtomicUsize,
}

impl StubPaymentRetrier {
    /// A retrier whose every retry succeeds unless scripted otherwise.
    pub fn always_succeeding() -> Self {
        Self::with_fallback(RetryOutcome::Succeeded)
    }

    /// A retrier whose every retry fails with `reason` unless scripted otherwise.
    pub fn always_failing(reason: impl Into<String>) -> Self {
        Self::with_fallback(RetryOutcome::Failed {
            reason: reason.into(),
        })
    }

    fn with_fallback(fallback: RetryOutcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Queues an outcome ahead of the fallback.
    pub fn then(self, outcome: RetryOutcome) -> Self {
        self.push(Step::Outcome(outcome));
        self
    }

    /// Queues a provider error ahead of the fallback.
    pub fn then_unavailable(self, message: impl Into<String>) -> Self {
        self.push(Step::ProviderDown(message.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(&self, step: Step) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
    }
}

#[async_trait]
impl PaymentRetrier for StubPaymentRetrier {
    async fn retry(&self, _event: &DunningEvent) -> Result<RetryOutcome, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match step {
            Some(Step::Outcome(outcome)) => Ok(outcome),
            Some(Step::ProviderDown(message)) => {
                Err(DomainError::new(ErrorCode::InternalError, message))
            }
            None => Ok(self.fallback.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dunning::{NewDunningEvent, RetryPolicy};
    use crate::domain::foundation::{PaymentId, Timestamp, UserId};
    use serde_json::Map;

    fn event() -> DunningEvent {
        DunningEvent::open(
            NewDunningEvent {
                user_id: UserId::new("u1").unwrap(),
                family_id: None,
                payment_id: PaymentId::new("pay_1").unwrap(),
                subscription_id: None,
                amount: 100,
                currency: "USD".to_string(),
                failure_reason: "declined".to_string(),
                metadata: Map::new(),
            },
            &RetryPolicy::default(),
            Timestamp::now(),
        )
    }

    #[tokio::test]
    async fn replays_script_then_falls_back() {
        let retrier = StubPaymentRetrier::always_succeeding()
            .then(RetryOutcome::Failed {
                reason: "insufficient_funds".to_string(),
            })
            .then_unavailable("provider timeout");
        let e = event();

        assert_eq!(
            retrier.retry(&e).await.unwrap(),
            RetryOutcome::Failed {
                reason: "insufficient_funds".to_string()
            }
        );
        assert!(retrier.retry(&e).await.is_err());
        assert_eq!(retrier.retry(&e).await.unwrap(), RetryOutcome::Succeeded);
        assert_eq!(retrier.calls(), 3);
    }
}

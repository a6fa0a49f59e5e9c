//! DunningEvent entity.
//!
//! # Invariants
//!
//! - `retry_count <= policy.max_attempts()`
//! - `next_retry_at` is `Some` only while `status == Active`
//! - `version` increases by one on every persisted update

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::domain::foundation::{
    DomainError, DunningEventId, ErrorCode, PaymentId, SubscriptionId, Timestamp, UserId,
};

use super::{DunningEventType, DunningStatus, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DunningEvent {
    pub id: DunningEventId,
    pub user_id: UserId,
    pub family_id: Option<String>,
    pub payment_id: PaymentId,
    pub subscription_id: Option<SubscriptionId>,
    pub event_type: DunningEventType,

    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub failure_reason: String,
    pub retry_count: u32,
    pub next_retry_at: Option<Timestamp>,
    pub status: DunningStatus,
    pub metadata: Map<String, JsonValue>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub version: u64,
}

/// Input for opening a dunning cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDunningEvent {
    pub user_id: UserId,
    pub family_id: Option<String>,
    pub payment_id: PaymentId,
    pub subscription_id: Option<SubscriptionId>,
    pub amount: i64,
    pub currency: String,
    pub failure_reason: String,
    pub metadata: Map<String, JsonValue>,
}

/// Outcome of recording a retry result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryResolution {
    Resolved,
    Rescheduled { next_retry_at: Timestamp },
    Escalated,
}

impl DunningEvent {
    /// Opens a new cycle with the first retry scheduled per `policy`.
    pub fn open(input: NewDunningEvent, policy: &RetryPolicy, now: Timestamp) -> Self {
        Self {
            id: DunningEventId::new(),
            user_id: input.user_id,
            family_id: input.family_id,
            payment_id: input.payment_id,
            subscription_id: input.subscription_id,
            event_type: DunningEventType::PaymentFailed,
            amount: input.amount,
            currency: input.currency,
            failure_reason: input.failure_reason,
            retry_count: 0,
            next_retry_at: policy.delay_for(0).map(|delay| now.plus(delay)),
            status: DunningStatus::Active,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Returns true if the event is active and its retry time has passed.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status.is_active() && self.next_retry_at.map_or(false, |at| !at.is_after(&now))
    }

    /// Counts one retry attempt.
    ///
    /// # Errors
    ///
    /// - `DunningNotActive` if the cycle already ended
    /// - `RetriesExhausted` if the ladder has no attempts left
    pub fn record_attempt(
        &mut self,
        policy: &RetryPolicy,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        if self.retry_count >= policy.max_attempts() {
            return Err(DomainError::new(
                ErrorCode::RetriesExhausted,
                "maximum retry attempts exceeded",
            )
            .with_detail("retry_count", self.retry_count.to_string()));
        }

        self.retry_count += 1;
        self.event_type = DunningEventType::RetryAttempted;
        self.updated_at = now;
        Ok(())
    }

    /// Records a successful retry. Escalated cycles may still be recovered
    /// by a late success.
    pub fn record_success(&mut self, now: Timestamp) -> Result<RetryResolution, DomainError> {
        if !matches!(self.status, DunningStatus::Active | DunningStatus::Escalated) {
            return Err(self.not_active_error());
        }

        self.event_type = DunningEventType::RetrySucceeded;
        self.status = DunningStatus::Resolved;
        self.next_retry_at = None;
        self.updated_at = now;
        Ok(RetryResolution::Resolved)
    }

    /// Records a failed retry, scheduling the next one or escalating when
    /// the ladder is exhausted.
    pub fn record_failure(
        &mut self,
        reason: impl Into<String>,
        policy: &RetryPolicy,
        now: Timestamp,
    ) -> Result<RetryResolution, DomainError> {
        self.ensure_active()?;

        self.event_type = DunningEventType::RetryFailed;
        self.failure_reason = reason.into();
        self.updated_at = now;

        let next_delay = if self.retry_count < policy.max_attempts() {
            policy.delay_for(self.retry_count)
        } else {
            None
        };

        match next_delay {
            Some(delay) => {
                let next_retry_at = now.plus(delay);
                self.next_retry_at = Some(next_retry_at);
                Ok(RetryResolution::Rescheduled { next_retry_at })
            }
            None => {
                self.status = DunningStatus::Escalated;
                self.event_type = DunningEventType::DunningEscalated;
                self.next_retry_at = None;
                Ok(RetryResolution::Escalated)
            }
        }
    }

    /// Cancels the cycle and records why.
    pub fn cancel(&mut self, reason: impl Into<String>, now: Timestamp) {
        self.status = DunningStatus::Cancelled;
        self.next_retry_at = None;
        self.metadata
            .insert("cancellation_reason".to_string(), JsonValue::String(reason.into()));
        self.updated_at = now;
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if self.status.is_active() {
            Ok(())
        } else {
            Err(self.not_active_error())
        }
    }

    fn not_active_error(&self) -> DomainError {
        DomainError::new(
            ErrorCode::DunningNotActive,
            format!("dunning event is {}", self.status),
        )
        .with_detail("dunning_event_id", self.id.to_string())
    }
}

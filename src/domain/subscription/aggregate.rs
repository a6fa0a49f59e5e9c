//! Subscription aggregate.
//!
//! # Invariants
//!
//! - `status` only changes along the transitions `SubscriptionStatus` allows
//! - `current_period_start <= current_period_end`
//! - `version` increases by one on every persisted update

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::foundation::{
    DomainError, ErrorCode, PlanId, StateMachine, SubscriptionId, Timestamp, UserId,
};

use super::SubscriptionStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub family_id: Option<String>,
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,
    pub cancel_at_period_end: bool,

    /// Subscription id at the payment provider.
    pub external_subscription_id: String,
    pub metadata: Option<JsonValue>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    /// Optimistic concurrency token; stores reject updates carrying a stale value.
    pub version: u64,
}

/// Input for creating a subscription at checkout completion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub user_id: UserId,
    pub family_id: Option<String>,
    pub plan_id: PlanId,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,
    pub external_subscription_id: String,
    pub metadata: Option<JsonValue>,
}

impl Subscription {
    /// Creates a new active subscription.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the period ends before it starts
    pub fn create(input: NewSubscription, now: Timestamp) -> Result<Self, DomainError> {
        if input.current_period_end.is_before(&input.current_period_start) {
            return Err(DomainError::validation(
                "current_period_end",
                "current period must not end before it starts",
            ));
        }

        Ok(Self {
            id: SubscriptionId::new(),
            user_id: input.user_id,
            family_id: input.family_id,
            plan_id: input.plan_id,
            status: SubscriptionStatus::Active,
            current_period_start: input.current_period_start,
            current_period_end: input.current_period_end,
            cancel_at_period_end: false,
            external_subscription_id: input.external_subscription_id,
            metadata: input.metadata,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Moves the subscription to `target`, returning the previous status.
    ///
    /// Entering `cancelled` stamps `cancelled_at`.
    pub fn transition_to(
        &mut self,
        target: SubscriptionStatus,
        now: Timestamp,
    ) -> Result<SubscriptionStatus, DomainError> {
        let previous = self.status;
        self.status = previous.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("invalid status transition from {} to {}", previous, target),
            )
            .with_detail("from", previous.as_str())
            .with_detail("to", target.as_str())
        })?;
        self.updated_at = now;

        if target == SubscriptionStatus::Cancelled {
            self.cancelled_at = Some(now);
        }

        Ok(previous)
    }

    /// Rolls the billing period forward so the old end becomes the new start.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotActive` unless the subscription is active
    /// - `ValidationFailed` if `new_period_end` is before the current period end
    pub fn renew(&mut self, new_period_end: Timestamp, now: Timestamp) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Active {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotActive,
                format!("cannot renew subscription with status {}", self.status),
            ));
        }
        if new_period_end.is_before(&self.current_period_end) {
            return Err(DomainError::validation(
                "new_period_end",
                "new period end must not precede the current period end",
            ));
        }

        self.current_period_start = self.current_period_end;
        self.current_period_end = new_period_end;
        self.updated_at = now;
        Ok(())
    }
}

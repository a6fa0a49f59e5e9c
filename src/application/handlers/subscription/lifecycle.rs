//! SubscriptionLifecycleManager - validated status transitions driven by
//! payment outcomes and manual operations.
//!
//! Every read-modify-write reloads the subscription and retries on version
//! conflicts, so concurrent callers cannot overwrite each other.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::application::handlers::entitlement::EntitlementEngine;
use crate::application::support::{publish_best_effort, retry_on_conflict};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp};
use crate::domain::subscription::{
    NewSubscription, Subscription, SubscriptionEvent, SubscriptionStatus,
};
use crate::ports::{EventPublisher, SubscriptionRepository};

/// Reason recorded when a successful payment restores access.
pub const REASON_PAYMENT_SUCCESSFUL: &str = "payment_successful";

pub struct SubscriptionLifecycleManager {
    repository: Arc<dyn SubscriptionRepository>,
    entitlements: Arc<EntitlementEngine>,
    publisher: Arc<dyn EventPublisher>,
}

impl SubscriptionLifecycleManager {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        entitlements: Arc<EntitlementEngine>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            entitlements,
            publisher,
        }
    }

    pub async fn create_subscription(
        &self,
        input: NewSubscription,
    ) -> Result<Subscription, DomainError> {
        let subscription = Subscription::create(input, Timestamp::now())?;
        let stored = self
            .repository
            .create(&subscription)
            .await
            .map_err(|e| e.context("create subscription"))?;

        let event = SubscriptionEvent::Created {
            subscription_id: stored.id,
            user_id: stored.user_id.clone(),
            plan_id: stored.plan_id,
            current_period_end: stored.current_period_end,
            occurred_at: stored.created_at,
        };
        publish_best_effort(self.publisher.as_ref(), &event, &stored.user_id).await;

        info!(subscription_id = %stored.id, user_id = %stored.user_id, "subscription created");
        Ok(stored)
    }

    /// Moves a subscription to `target`.
    ///
    /// Entering `expired` revokes the subscription's entitlements. Revocation
    /// failures are logged and do not undo the transition.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the subscription does not exist
    /// - `InvalidStateTransition` if the transition is not allowed
    /// - `ConcurrentModification` if conflicts outlast the retry budget
    pub async fn update_status(
        &self,
        id: &SubscriptionId,
        target: SubscriptionStatus,
        reason: &str,
    ) -> Result<Subscription, DomainError> {
        self.step(id, reason, move |_| Some(target)).await
    }

    /// Steps the subscription one rung down the failure ladder
    /// (`active → past_due → suspended → cancelled`). Other statuses are left
    /// untouched.
    pub async fn process_payment_failure(
        &self,
        id: &SubscriptionId,
        reason: &str,
    ) -> Result<Subscription, DomainError> {
        self.step(id, reason, |status| status.on_payment_failure()).await
    }

    /// Restores a `past_due` or `suspended` subscription to `active`.
    pub async fn process_payment_success(
        &self,
        id: &SubscriptionId,
    ) -> Result<Subscription, DomainError> {
        self.step(id, REASON_PAYMENT_SUCCESSFUL, |status| status.on_payment_success()).await
    }

    /// Applies the transition `pick` chooses for the current status, re-picking
    /// after every reload. `None` leaves the subscription untouched.
    async fn step<P>(
        &self,
        id: &SubscriptionId,
        reason: &str,
        pick: P,
    ) -> Result<Subscription, DomainError>
    where
        P: Fn(SubscriptionStatus) -> Option<SubscriptionStatus> + Copy,
    {
        let (current, previous) = retry_on_conflict("update subscription status", move || {
            self.try_transition(id, pick)
        })
        .await?;
        match previous {
            Some(previous) => Ok(self.finish_transition(current, previous, reason).await),
            None => {
                debug!(
                    subscription_id = %id,
                    status = %current.status,
                    "no transition for current status"
                );
                Ok(current)
            }
        }
    }

    pub async fn cancel_subscription(
        &self,
        id: &SubscriptionId,
        reason: &str,
    ) -> Result<Subscription, DomainError> {
        self.update_status(id, SubscriptionStatus::Cancelled, reason).await
    }

    /// Rolls an active subscription into its next billing period.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the subscription does not exist
    /// - `SubscriptionNotActive` unless the subscription is active
    pub async fn renew_subscription(
        &self,
        id: &SubscriptionId,
        new_period_end: Timestamp,
    ) -> Result<Subscription, DomainError> {
        let renewed = retry_on_conflict("renew subscription", move || async move {
            let mut subscription = self.load(id).await?;
            subscription.renew(new_period_end, Timestamp::now())?;
            self.repository
                .update(&subscription)
                .await
                .map_err(|e| e.context("renew subscription"))
        })
        .await?;

        let event = SubscriptionEvent::Renewed {
            subscription_id: renewed.id,
            user_id: renewed.user_id.clone(),
            current_period_start: renewed.current_period_start,
            current_period_end: renewed.current_period_end,
            occurred_at: renewed.updated_at,
        };
        publish_best_effort(self.publisher.as_ref(), &event, &renewed.user_id).await;

        info!(
            subscription_id = %renewed.id,
            current_period_end = %renewed.current_period_end,
            "subscription renewed"
        );
        Ok(renewed)
    }

    /// Active subscriptions whose period ends within `within_days` from now.
    pub async fn get_expiring_subscriptions(
        &self,
        within_days: i64,
    ) -> Result<Vec<Subscription>, DomainError> {
        if within_days < 0 {
            return Err(DomainError::validation("within_days", "must not be negative"));
        }
        let cutoff = Timestamp::now().plus_days(within_days);
        self.repository
            .find_expiring_before(cutoff)
            .await
            .map_err(|e| e.context("find expiring subscriptions"))
    }

    pub async fn get_subscriptions_by_status(
        &self,
        status: SubscriptionStatus,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.repository
            .find_by_status(status)
            .await
            .map_err(|e| e.context("find subscriptions by status"))
    }

    pub async fn get_subscription(&self, id: &SubscriptionId) -> Result<Subscription, DomainError> {
        self.load(id).await
    }

    /// Returns the stored subscription and, when a transition happened, the
    /// status it left.
    async fn try_transition<P>(
        &self,
        id: &SubscriptionId,
        pick: P,
    ) -> Result<(Subscription, Option<SubscriptionStatus>), DomainError>
    where
        P: Fn(SubscriptionStatus) -> Option<SubscriptionStatus>,
    {
        let mut subscription = self.load(id).await?;
        let Some(target) = pick(subscription.status) else {
            return Ok((subscription, None));
        };
        let previous = subscription.transition_to(target, Timestamp::now())?;
        let stored = self
            .repository
            .update(&subscription)
            .await
            .map_err(|e| e.context("update subscription"))?;
        Ok((stored, Some(previous)))
    }

    async fn finish_transition(
        &self,
        updated: Subscription,
        previous: SubscriptionStatus,
        reason: &str,
    ) -> Subscription {
        if updated.status == SubscriptionStatus::Expired {
            self.revoke_entitlements(&updated).await;
        }

        let event = SubscriptionEvent::StatusChanged {
            subscription_id: updated.id,
            user_id: updated.user_id.clone(),
            old_status: previous,
            new_status: updated.status,
            reason: reason.to_string(),
            occurred_at: updated.updated_at,
        };
        publish_best_effort(self.publisher.as_ref(), &event, &updated.user_id).await;

        info!(
            subscription_id = %updated.id,
            old_status = %previous,
            new_status = %updated.status,
            reason,
            "subscription status changed"
        );
        updated
    }

    async fn load(&self, id: &SubscriptionId) -> Result<Subscription, DomainError> {
        self.repository
            .find_by_id(id)
            .await
            .map_err(|e| e.context("load subscription"))?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("subscription {} not found", id),
                )
            })
    }

    async fn revoke_entitlements(&self, subscription: &Subscription) {
        match self
            .entitlements
            .revoke_subscription_entitlements(&subscription.id)
            .await
        {
            Ok(summary) if summary.failed > 0 => {
                error!(
                    subscription_id = %subscription.id,
                    revoked = summary.revoked,
                    failed = summary.failed,
                    "some entitlements could not be revoked"
                );
            }
            Ok(summary) => {
                info!(
                    subscription_id = %subscription.id,
                    revoked = summary.revoked,
                    "entitlements revoked"
                );
            }
            Err(err) => {
                error!(
                    subscription_id = %subscription.id,
                    error = %err,
                    "failed to revoke entitlements"
                );
            }
        }
    }
}

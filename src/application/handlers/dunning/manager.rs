//! DunningManager - retry bookkeeping and escalation for failed payments.
//!
//! A cycle opens on the first failure of a payment, counts retry attempts
//! against the configured ladder, and ends resolved, cancelled or escalated.
//! Escalation suspends the linked subscription; a late success restores it.
//! Cross-component calls are best effort: their failures are logged and do
//! not fail the dunning update.

use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};
use tracing::{error, info, warn};

use crate::application::handlers::subscription::SubscriptionLifecycleManager;
use crate::application::support::{publish_best_effort, retry_on_conflict};
use crate::domain::dunning::{
    DunningActivity, DunningEvent, DunningSnapshot, DunningStatus, NewDunningEvent, RetryPolicy,
    RetryResolution,
};
use crate::domain::foundation::{
    DomainError, DunningEventId, ErrorCode, PaymentId, SubscriptionId, Timestamp, UserId,
};
use crate::domain::subscription::SubscriptionStatus;
use crate::ports::{DunningEventRepository, EventPublisher, PaymentRepository};

/// Reason given to the subscription when dunning escalates.
pub const REASON_PAYMENT_FAILURE: &str = "payment_failure";

/// Command to open a dunning cycle for a failed payment.
#[derive(Debug, Clone, Default)]
pub struct ProcessPaymentFailureCommand {
    pub payment_id: String,
    pub user_id: String,
    pub family_id: Option<String>,

    /// Falls back to the payment's own subscription when absent.
    pub subscription_id: Option<SubscriptionId>,
    pub failure_reason: String,
    pub metadata: Map<String, JsonValue>,
}

pub struct DunningManager {
    events: Arc<dyn DunningEventRepository>,
    payments: Arc<dyn PaymentRepository>,
    subscriptions: Arc<SubscriptionLifecycleManager>,
    publisher: Arc<dyn EventPublisher>,
    policy: RetryPolicy,
}

impl DunningManager {
    pub fn new(
        events: Arc<dyn DunningEventRepository>,
        payments: Arc<dyn PaymentRepository>,
        subscriptions: Arc<SubscriptionLifecycleManager>,
        publisher: Arc<dyn EventPublisher>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            events,
            payments,
            subscriptions,
            publisher,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Opens a dunning cycle and schedules its first retry.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the payment or user id is blank
    /// - `PaymentNotFound` if the payment does not exist
    /// - `DatabaseError` if the cycle cannot be stored
    pub async fn process_payment_failure(
        &self,
        cmd: ProcessPaymentFailureCommand,
    ) -> Result<DunningEvent, DomainError> {
        let payment_id = PaymentId::new(cmd.payment_id)?;
        let user_id = UserId::new(cmd.user_id)?;

        let mut payment = self
            .payments
            .find_by_id(&payment_id)
            .await
            .map_err(|e| e.context("load payment"))?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::PaymentNotFound,
                    format!("payment not found: {}", payment_id),
                )
            })?;

        let now = Timestamp::now();
        let opened = DunningEvent::open(
            NewDunningEvent {
                user_id,
                family_id: cmd.family_id,
                payment_id,
                subscription_id: cmd.subscription_id.or(payment.subscription_id),
                amount: payment.amount,
                currency: payment.currency.clone(),
                failure_reason: cmd.failure_reason,
                metadata: cmd.metadata,
            },
            &self.policy,
            now,
        );
        let stored = self
            .events
            .insert(&opened)
            .await
            .map_err(|e| e.context("store dunning event"))?;

        payment.mark_failed(&stored.failure_reason, &stored.id.to_string(), now);
        if let Err(err) = self.payments.update(&payment).await {
            error!(
                payment_id = %payment.id,
                dunning_event_id = %stored.id,
                error = %err,
                "failed to mark payment failed"
            );
        }

        self.publish(DunningActivity::PaymentFailed(DunningSnapshot::from(&stored)), &stored)
            .await;

        info!(
            dunning_event_id = %stored.id,
            payment_id = %stored.payment_id,
            user_id = %stored.user_id,
            "dunning cycle opened"
        );
        Ok(stored)
    }

    /// Counts one retry attempt.
    ///
    /// # Errors
    ///
    /// - `DunningEventNotFound` if the event does not exist
    /// - `DunningNotActive` if the cycle already ended
    /// - `RetriesExhausted` if no attempts remain
    pub async fn process_retry_attempt(
        &self,
        id: &DunningEventId,
    ) -> Result<DunningEvent, DomainError> {
        let attempted = retry_on_conflict("record retry attempt", move || async move {
            let mut event = self.load(id).await?;
            event.record_attempt(&self.policy, Timestamp::now())?;
            self.store(&event).await
        })
        .await?;

        self.publish(DunningActivity::RetryAttempted(DunningSnapshot::from(&attempted)), &attempted)
            .await;
        Ok(attempted)
    }

    /// Counts an attempt against the exact version a scan observed, without
    /// reloading. A conflict means someone else touched the event first.
    pub(crate) async fn attempt_scheduled(
        &self,
        scanned: &DunningEvent,
    ) -> Result<DunningEvent, DomainError> {
        let mut event = scanned.clone();
        event.record_attempt(&self.policy, Timestamp::now())?;
        let attempted = self.store(&event).await?;

        self.publish(DunningActivity::RetryAttempted(DunningSnapshot::from(&attempted)), &attempted)
            .await;
        Ok(attempted)
    }

    /// Applies the outcome of a retry.
    ///
    /// Success resolves the cycle and settles the payment. Failure schedules
    /// the next retry, or escalates and suspends the subscription once the
    /// ladder is exhausted. `reason` replaces the recorded failure reason.
    ///
    /// # Errors
    ///
    /// - `DunningEventNotFound` if the event does not exist
    /// - `DunningNotActive` if the cycle cannot accept this outcome
    pub async fn process_retry_result(
        &self,
        id: &DunningEventId,
        success: bool,
        reason: Option<&str>,
    ) -> Result<DunningEvent, DomainError> {
        let (updated, resolution) = retry_on_conflict("record retry result", move || async move {
            let mut event = self.load(id).await?;
            let now = Timestamp::now();
            let resolution = if success {
                event.record_success(now)?
            } else {
                let reason = reason.map_or_else(|| event.failure_reason.clone(), str::to_string);
                event.record_failure(reason, &self.policy, now)?
            };
            let stored = self.store(&event).await?;
            Ok((stored, resolution))
        })
        .await?;

        self.publish(
            DunningActivity::RetryResult {
                snapshot: DunningSnapshot::from(&updated),
                success,
            },
            &updated,
        )
        .await;

        match resolution {
            RetryResolution::Resolved => {
                self.settle_payment(&updated).await;
                if let Some(subscription_id) = updated.subscription_id {
                    self.restore_subscription(&updated, &subscription_id).await;
                }
                info!(
                    dunning_event_id = %updated.id,
                    retry_count = updated.retry_count,
                    "dunning resolved"
                );
            }
            RetryResolution::Rescheduled { next_retry_at } => {
                info!(
                    dunning_event_id = %updated.id,
                    retry_count = updated.retry_count,
                    next_retry_at = %next_retry_at,
                    "retry rescheduled"
                );
            }
            RetryResolution::Escalated => {
                self.publish(DunningActivity::Escalated(DunningSnapshot::from(&updated)), &updated)
                    .await;
                if let Some(subscription_id) = updated.subscription_id {
                    self.suspend_subscription(&updated, &subscription_id).await;
                }
                warn!(
                    dunning_event_id = %updated.id,
                    retry_count = updated.retry_count,
                    "dunning escalated"
                );
            }
        }

        Ok(updated)
    }

    /// Ends a cycle without further retries.
    pub async fn cancel_dunning_event(
        &self,
        id: &DunningEventId,
        reason: &str,
    ) -> Result<DunningEvent, DomainError> {
        let cancelled = retry_on_conflict("cancel dunning event", move || async move {
            let mut event = self.load(id).await?;
            event.cancel(reason, Timestamp::now());
            self.store(&event).await
        })
        .await?;

        self.publish(
            DunningActivity::Cancelled {
                snapshot: DunningSnapshot::from(&cancelled),
                reason: reason.to_string(),
            },
            &cancelled,
        )
        .await;

        info!(dunning_event_id = %cancelled.id, reason, "dunning cancelled");
        Ok(cancelled)
    }

    /// A user's dunning events, newest first.
    pub async fn get_dunning_events(
        &self,
        user_id: &str,
        status: Option<DunningStatus>,
    ) -> Result<Vec<DunningEvent>, DomainError> {
        let user_id = UserId::new(user_id)?;
        self.events
            .find_by_user(&user_id, status)
            .await
            .map_err(|e| e.context("list dunning events"))
    }

    pub async fn get_dunning_event(
        &self,
        id: &DunningEventId,
    ) -> Result<DunningEvent, DomainError> {
        self.load(id).await
    }

    /// Active events whose retry time has passed, oldest first.
    pub async fn due_events(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<DunningEvent>, DomainError> {
        self.events
            .find_due(now, limit)
            .await
            .map_err(|e| e.context("find due dunning events"))
    }

    async fn load(&self, id: &DunningEventId) -> Result<DunningEvent, DomainError> {
        self.events
            .find_by_id(id)
            .await
            .map_err(|e| e.context("load dunning event"))?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::DunningEventNotFound,
                    format!("dunning event not found: {}", id),
                )
            })
    }

    async fn store(&self, event: &DunningEvent) -> Result<DunningEvent, DomainError> {
        self.events
            .update(event)
            .await
            .map_err(|e| e.context("update dunning event"))
    }

    async fn publish(&self, activity: DunningActivity, event: &DunningEvent) {
        publish_best_effort(self.publisher.as_ref(), &activity, &event.user_id).await;
    }

    async fn settle_payment(&self, event: &DunningEvent) {
        let mut payment = match self.payments.find_by_id(&event.payment_id).await {
            Ok(Some(payment)) => payment,
            Ok(None) => {
                warn!(
                    payment_id = %event.payment_id,
                    "payment for resolved dunning event not found"
                );
                return;
            }
            Err(err) => {
                error!(payment_id = %event.payment_id, error = %err, "failed to load payment");
                return;
            }
        };

        payment.mark_retry_succeeded(event.retry_count, Timestamp::now());
        if let Err(err) = self.payments.update(&payment).await {
            error!(payment_id = %payment.id, error = %err, "failed to mark payment succeeded");
        }
    }

    async fn restore_subscription(&self, event: &DunningEvent, subscription_id: &SubscriptionId) {
        if let Err(err) = self.subscriptions.process_payment_success(subscription_id).await {
            error!(
                dunning_event_id = %event.id,
                subscription_id = %subscription_id,
                error = %err,
                "failed to restore subscription after recovered payment"
            );
        }
    }

    async fn suspend_subscription(&self, event: &DunningEvent, subscription_id: &SubscriptionId) {
        match self
            .subscriptions
            .update_status(subscription_id, SubscriptionStatus::Suspended, REASON_PAYMENT_FAILURE)
            .await
        {
            Ok(_) => {}
            Err(err) if err.code == ErrorCode::InvalidStateTransition => {
                warn!(
                    dunning_event_id = %event.id,
                    subscription_id = %subscription_id,
                    error = %err,
                    "subscription cannot be suspended from its current status"
                );
            }
            Err(err) => {
                error!(
                    dunning_event_id = %event.id,
                    subscription_id = %subscription_id,
                    error = %err,
                    "failed to suspend subscription"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        InMemoryDunningEventRepository, InMemoryEntitlementCache, InMemoryEntitlementRepository,
        InMemoryEventBus, InMemoryPaymentRepository, InMemorySubscriptionRepository,
    };
    use crate::application::handlers::entitlement::EntitlementEngine;
    use crate::config::EntitlementConfig;
    use crate::domain::dunning::DunningEventType;
    use crate::domain::foundation::{PlanId, StatusClass};
    use crate::domain::payment::{Payment, PaymentStatus};
    use crate::domain::subscription::{NewSubscription, Subscription};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    /// Payment store that serves seeded payments but rejects updates.
    struct ReadOnlyPaymentRepository {
        payments: Mutex<Vec<Payment>>,
        fail_update: bool,
    }

    impl ReadOnlyPaymentRepository {
        fn failing_update(payment: Payment) -> Self {
            Self {
                payments: Mutex::new(vec![payment]),
                fail_update: true,
            }
        }
    }

    #[async_trait]
    impl PaymentRepository for ReadOnlyPaymentRepository {
        async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
            Ok(self.payments.lock().unwrap().iter().find(|p| &p.id == id).cloned())
        }

        async fn update(&self, _payment: &Payment) -> Result<(), DomainError> {
            if self.fail_update {
                return Err(DomainError::new(ErrorCode::DatabaseError, "payments table locked"));
            }
            Ok(())
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        payments: Arc<InMemoryPaymentRepository>,
        lifecycle: Arc<SubscriptionLifecycleManager>,
        bus: Arc<InMemoryEventBus>,
        manager: DunningManager,
    }

    fn lifecycle(bus: Arc<InMemoryEventBus>) -> Arc<SubscriptionLifecycleManager> {
        let engine = Arc::new(EntitlementEngine::new(
            Arc::new(InMemoryEntitlementRepository::new()),
            Arc::new(InMemoryEntitlementCache::new()),
            bus.clone(),
            EntitlementConfig::default(),
        ));
        Arc::new(SubscriptionLifecycleManager::new(
            Arc::new(InMemorySubscriptionRepository::new()),
            engine,
            bus,
        ))
    }

    fn fixture() -> Fixture {
        let bus = Arc::new(InMemoryEventBus::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let lifecycle = lifecycle(bus.clone());
        let manager = DunningManager::new(
            Arc::new(InMemoryDunningEventRepository::new()),
            payments.clone(),
            lifecycle.clone(),
            bus.clone(),
            RetryPolicy::default(),
        );
        Fixture {
            payments,
            lifecycle,
            bus,
            manager,
        }
    }

    fn payment(id: &str, subscription_id: Option<SubscriptionId>) -> Payment {
        let now = Timestamp::now();
        Payment {
            id: PaymentId::new(id).unwrap(),
            user_id: UserId::new("u1").unwrap(),
            subscription_id,
            amount: 1999,
            currency: "USD".to_string(),
            status: PaymentStatus::Pending,
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn failure(payment_id: &str) -> ProcessPaymentFailureCommand {
        ProcessPaymentFailureCommand {
            payment_id: payment_id.to_string(),
            user_id: "u1".to_string(),
            failure_reason: "card_declined".to_string(),
            ..ProcessPaymentFailureCommand::default()
        }
    }

    async fn subscription(f: &Fixture) -> Subscription {
        let now = Timestamp::now();
        f.lifecycle
            .create_subscription(NewSubscription {
                user_id: UserId::new("u1").unwrap(),
                family_id: None,
                plan_id: PlanId::new(),
                current_period_start: now,
                current_period_end: now.plus_days(30),
                external_subscription_id: "sub_ext_1".to_string(),
                metadata: None,
            })
            .await
            .unwrap()
    }

    /// Opens a cycle for a payment linked to a fresh subscription.
    async fn open_with_subscription(f: &Fixture) -> (DunningEvent, Subscription) {
        let sub = subscription(f).await;
        f.payments.insert(payment("pay_1", Some(sub.id))).await;
        let event = f.manager.process_payment_failure(failure("pay_1")).await.unwrap();
        (event, sub)
    }

    async fn fail_once(f: &Fixture, id: &DunningEventId) -> DunningEvent {
        f.manager.process_retry_attempt(id).await.unwrap();
        f.manager
            .process_retry_result(id, false, Some("insufficient_funds"))
            .await
            .unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payment Failure Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn opens_cycle_with_first_retry_scheduled() {
        let f = fixture();
        f.payments.insert(payment("pay_1", None)).await;
        let before = Timestamp::now();

        let event = f.manager.process_payment_failure(failure("pay_1")).await.unwrap();

        let after = Timestamp::now();
        let hour = Duration::from_secs(3600);
        let next = event.next_retry_at.unwrap();
        assert!(!next.is_before(&before.plus(hour)));
        assert!(!next.is_after(&after.plus(hour)));
        assert_eq!(event.retry_count, 0);
        assert_eq!(event.status, DunningStatus::Active);
        assert_eq!(event.event_type, DunningEventType::PaymentFailed);
        assert_eq!(event.amount, 1999);
        assert_eq!(event.currency, "USD");
    }

    #[tokio::test]
    async fn marks_payment_failed_and_links_cycle() {
        let f = fixture();
        f.payments.insert(payment("pay_1", None)).await;

        let event = f.manager.process_payment_failure(failure("pay_1")).await.unwrap();

        let stored = f
            .payments
            .find_by_id(&PaymentId::new("pay_1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);
        assert_eq!(stored.metadata["failure_reason"], "card_declined");
        assert_eq!(stored.metadata["dunning_event_id"], event.id.to_string());
        assert!(f.bus.has_event("dunning.payment_failed"));
    }

    #[tokio::test]
    async fn inherits_subscription_from_payment() {
        let f = fixture();
        let (event, sub) = open_with_subscription(&f).await;

        assert_eq!(event.subscription_id, Some(sub.id));
    }

    #[tokio::test]
    async fn payment_update_failure_does_not_fail_the_cycle() {
        let bus = Arc::new(InMemoryEventBus::new());
        let manager = DunningManager::new(
            Arc::new(InMemoryDunningEventRepository::new()),
            Arc::new(ReadOnlyPaymentRepository::failing_update(payment("pay_1", None))),
            lifecycle(bus.clone()),
            bus,
            RetryPolicy::default(),
        );

        let result = manager.process_payment_failure(failure("pay_1")).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn rejects_missing_ids() {
        let f = fixture();
        let mut no_payment = failure("");
        no_payment.payment_id = String::new();
        let mut no_user = failure("pay_1");
        no_user.user_id = " ".to_string();

        let a = f.manager.process_payment_failure(no_payment).await.unwrap_err();
        let b = f.manager.process_payment_failure(no_user).await.unwrap_err();

        assert_eq!(a.status(), StatusClass::InvalidArgument);
        assert_eq!(b.status(), StatusClass::InvalidArgument);
    }

    #[tokio::test]
    async fn unknown_payment_is_not_found() {
        let f = fixture();

        let err = f.manager.process_payment_failure(failure("pay_missing")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::PaymentNotFound);
        assert_eq!(err.status(), StatusClass::NotFound);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Retry Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn attempt_increments_retry_count() {
        let f = fixture();
        f.payments.insert(payment("pay_1", None)).await;
        let opened = f.manager.process_payment_failure(failure("pay_1")).await.unwrap();

        let attempted = f.manager.process_retry_attempt(&opened.id).await.unwrap();

        assert_eq!(attempted.retry_count, 1);
        assert_eq!(attempted.event_type, DunningEventType::RetryAttempted);
        assert!(f.bus.has_event("dunning.retry_attempted"));
    }

    #[tokio::test]
    async fn attempt_after_exhaustion_is_failed_precondition() {
        let f = fixture();
        f.payments.insert(payment("pay_1", None)).await;
        let opened = f.manager.process_payment_failure(failure("pay_1")).await.unwrap();
        for _ in 0..3 {
            f.manager.process_retry_attempt(&opened.id).await.unwrap();
        }

        let err = f.manager.process_retry_attempt(&opened.id).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::RetriesExhausted);
        assert_eq!(err.status(), StatusClass::FailedPrecondition);
    }

    #[tokio::test]
    async fn attempt_on_ended_cycle_is_failed_precondition() {
        let f = fixture();
        f.payments.insert(payment("pay_1", None)).await;
        let opened = f.manager.process_payment_failure(failure("pay_1")).await.unwrap();
        f.manager.cancel_dunning_event(&opened.id, "customer_left").await.unwrap();

        let err = f.manager.process_retry_attempt(&opened.id).await.unwrap_err();

        assert_eq!(err.status(), StatusClass::FailedPrecondition);
    }

    #[tokio::test]
    async fn failed_retry_schedules_next_interval() {
        let f = fixture();
        f.payments.insert(payment("pay_1", None)).await;
        let opened = f.manager.process_payment_failure(failure("pay_1")).await.unwrap();
        let before = Timestamp::now();

        let failed = fail_once(&f, &opened.id).await;

        let day = Duration::from_secs(86_400);
        assert_eq!(failed.status, DunningStatus::Active);
        assert_eq!(failed.event_type, DunningEventType::RetryFailed);
        assert_eq!(failed.failure_reason, "insufficient_funds");
        assert!(!failed.next_retry_at.unwrap().is_before(&before.plus(day)));
    }

    #[tokio::test]
    async fn three_failed_cycles_escalate_and_suspend_subscription() {
        let f = fixture();
        let (opened, sub) = open_with_subscription(&f).await;

        let mut last = None;
        for _ in 0..3 {
            last = Some(fail_once(&f, &opened.id).await);
        }
        let last = last.unwrap();

        assert_eq!(last.retry_count, 3);
        assert_eq!(last.status, DunningStatus::Escalated);
        assert_eq!(last.event_type, DunningEventType::DunningEscalated);
        assert!(last.next_retry_at.is_none());
        assert!(f.bus.has_event("dunning.escalated"));
        let stored = f.lifecycle.get_subscription(&sub.id).await.unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Suspended);
    }

    #[tokio::test]
    async fn success_resolves_and_settles_payment() {
        let f = fixture();
        let (opened, sub) = open_with_subscription(&f).await;
        f.lifecycle.process_payment_failure(&sub.id, "card_declined").await.unwrap();
        fail_once(&f, &opened.id).await;
        f.manager.process_retry_attempt(&opened.id).await.unwrap();

        let resolved = f
            .manager
            .process_retry_result(&opened.id, true, None)
            .await
            .unwrap();

        assert_eq!(resolved.status, DunningStatus::Resolved);
        assert_eq!(resolved.event_type, DunningEventType::RetrySucceeded);
        assert!(resolved.next_retry_at.is_none());
        let paid = f.payments.find_by_id(&opened.payment_id).await.unwrap().unwrap();
        assert_eq!(paid.status, PaymentStatus::Succeeded);
        assert_eq!(paid.metadata["retry_succeeded"], true);
        assert_eq!(paid.metadata["retry_count"], 2);
        let restored = f.lifecycle.get_subscription(&sub.id).await.unwrap();
        assert_eq!(restored.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn late_success_recovers_escalated_cycle() {
        let f = fixture();
        let (opened, sub) = open_with_subscription(&f).await;
        for _ in 0..3 {
            fail_once(&f, &opened.id).await;
        }

        let resolved = f
            .manager
            .process_retry_result(&opened.id, true, None)
            .await
            .unwrap();

        assert_eq!(resolved.status, DunningStatus::Resolved);
        let restored = f.lifecycle.get_subscription(&sub.id).await.unwrap();
        assert_eq!(restored.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn failure_result_on_resolved_cycle_is_rejected() {
        let f = fixture();
        f.payments.insert(payment("pay_1", None)).await;
        let opened = f.manager.process_payment_failure(failure("pay_1")).await.unwrap();
        f.manager.process_retry_result(&opened.id, true, None).await.unwrap();

        let err = f
            .manager
            .process_retry_result(&opened.id, false, Some("late"))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::DunningNotActive);
        assert_eq!(err.status(), StatusClass::FailedPrecondition);
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let f = fixture();

        let err = f
            .manager
            .process_retry_result(&DunningEventId::new(), true, None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusClass::NotFound);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Cancel / Query Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn cancel_stops_retries_and_records_reason() {
        let f = fixture();
        f.payments.insert(payment("pay_1", None)).await;
        let opened = f.manager.process_payment_failure(failure("pay_1")).await.unwrap();

        let cancelled = f
            .manager
            .cancel_dunning_event(&opened.id, "customer_left")
            .await
            .unwrap();

        assert_eq!(cancelled.status, DunningStatus::Cancelled);
        assert!(cancelled.next_retry_at.is_none());
        assert_eq!(cancelled.metadata["cancellation_reason"], "customer_left");
        let events = f.bus.events_of_type("dunning.cancelled");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["reason"], "customer_left");
    }

    #[tokio::test]
    async fn lists_user_events_with_status_filter() {
        let f = fixture();
        f.payments.insert(payment("pay_1", None)).await;
        f.payments.insert(payment("pay_2", None)).await;
        let first = f.manager.process_payment_failure(failure("pay_1")).await.unwrap();
        f.manager.process_payment_failure(failure("pay_2")).await.unwrap();
        f.manager.cancel_dunning_event(&first.id, "duplicate").await.unwrap();

        let all = f.manager.get_dunning_events("u1", None).await.unwrap();
        let active = f
            .manager
            .get_dunning_events("u1", Some(DunningStatus::Active))
            .await
            .unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(active.len(), 1);
        assert_ne!(active[0].id, first.id);
    }

    #[tokio::test]
    async fn scheduled_attempt_on_stale_copy_conflicts() {
        let f = fixture();
        f.payments.insert(payment("pay_1", None)).await;
        let scanned = f.manager.process_payment_failure(failure("pay_1")).await.unwrap();
        f.manager.process_retry_attempt(&scanned.id).await.unwrap();

        let err = f.manager.attempt_scheduled(&scanned).await.unwrap_err();

        assert!(err.is_conflict());
        let stored = f.manager.get_dunning_event(&scanned.id).await.unwrap();
        assert_eq!(stored.retry_count, 1);
    }
}

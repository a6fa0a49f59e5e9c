//! Bulk entitlement checks.
//!
//! Each item runs the single-check algorithm independently with at most
//! `bulk_concurrency` items in flight. Results land in the slot matching the
//! input index. A failing or cancelled item yields an unauthorized result
//! with a reason and never fails the batch.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::entitlement::Entitlement;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};

use super::engine::{require_feature_code, DecisionSource, EntitlementEngine};

const REASON_MISSING_FEATURE: &str = "feature_code is required";
const REASON_INTERNAL: &str = "Internal error checking entitlement";
const REASON_CANCELLED: &str = "check cancelled";

/// One feature to check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkCheckItem {
    pub feature_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_size: Option<i64>,

    /// Echoed back on authorized results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

impl BulkCheckItem {
    pub fn feature(feature_code: impl Into<String>) -> Self {
        Self {
            feature_code: feature_code.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct BulkCheckCommand {
    pub user_id: String,
    pub checks: Vec<BulkCheckItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkCheckResult {
    pub feature_code: String,
    pub authorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entitlement: Option<Entitlement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

impl BulkCheckResult {
    fn rejected(feature_code: &str, reason: &str) -> Self {
        Self {
            feature_code: feature_code.to_string(),
            authorized: false,
            entitlement: None,
            reason: Some(reason.to_string()),
            upgrade_url: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCheckSummary {
    pub total: usize,
    pub authorized: usize,
    pub not_authorized: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkCheckResponse {
    pub results: Vec<BulkCheckResult>,
    pub summary: BulkCheckSummary,
}

impl EntitlementEngine {
    /// Checks up to `bulk_max_batch` features for one user.
    ///
    /// When `cancel` fires, finished items keep their results and the rest
    /// come back unauthorized with reason "check cancelled".
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the user id is blank
    /// - `ValidationFailed` if `checks` is empty
    /// - `BatchSizeExceeded` if `checks` exceeds the configured maximum
    pub async fn bulk_check_entitlements(
        &self,
        cmd: BulkCheckCommand,
        cancel: CancellationToken,
    ) -> Result<BulkCheckResponse, DomainError> {
        let started = Instant::now();
        let user_id = UserId::new(cmd.user_id)?;

        if cmd.checks.is_empty() {
            return Err(DomainError::validation("checks", "at least one check is required"));
        }
        if cmd.checks.len() > self.config.bulk_max_batch {
            return Err(DomainError::new(
                ErrorCode::BatchSizeExceeded,
                format!(
                    "maximum {} checks allowed per request",
                    self.config.bulk_max_batch
                ),
            )
            .with_detail("actual", cmd.checks.len().to_string()));
        }

        let permits = Semaphore::new(self.config.bulk_concurrency.max(1));
        let summary = Mutex::new(BulkCheckSummary {
            total: cmd.checks.len(),
            ..BulkCheckSummary::default()
        });

        let pending = cmd.checks.iter().map(|item| {
            let (permits, summary, cancel, user_id) = (&permits, &summary, &cancel, &user_id);
            async move {
                let (result, source) = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        (BulkCheckResult::rejected(&item.feature_code, REASON_CANCELLED), None)
                    }
                    checked = async {
                        let _permit = permits.acquire().await;
                        self.check_item(user_id, item).await
                    } => checked,
                };

                tally(summary, &result, source);
                result
            }
        });

        // join_all yields in input order, so results[i] answers checks[i].
        let results = join_all(pending).await;

        let mut summary = summary.into_inner().unwrap_or_else(PoisonError::into_inner);
        summary.processing_time_ms = started.elapsed().as_millis() as u64;

        info!(
            user_id = %user_id,
            total = summary.total,
            authorized = summary.authorized,
            not_authorized = summary.not_authorized,
            cache_hits = summary.cache_hits,
            processing_time_ms = summary.processing_time_ms,
            "bulk entitlement check completed"
        );

        Ok(BulkCheckResponse { results, summary })
    }

    async fn check_item(
        &self,
        user_id: &UserId,
        item: &BulkCheckItem,
    ) -> (BulkCheckResult, Option<DecisionSource>) {
        if require_feature_code(&item.feature_code).is_err() {
            return (
                BulkCheckResult::rejected(&item.feature_code, REASON_MISSING_FEATURE),
                None,
            );
        }

        match self.evaluate(user_id, &item.feature_code).await {
            Ok((decision, source)) => {
                let metadata = if decision.allowed { item.metadata.clone() } else { None };
                let result = BulkCheckResult {
                    feature_code: item.feature_code.clone(),
                    authorized: decision.allowed,
                    entitlement: decision.entitlement,
                    reason: decision.reason,
                    upgrade_url: decision.upgrade_url,
                    metadata,
                };
                (result, Some(source))
            }
            Err(err) => {
                error!(
                    user_id = %user_id,
                    feature_code = %item.feature_code,
                    error = %err,
                    "failed to check entitlement"
                );
                (
                    BulkCheckResult::rejected(&item.feature_code, REASON_INTERNAL),
                    Some(DecisionSource::Repository),
                )
            }
        }
    }
}

fn tally(
    summary: &Mutex<BulkCheckSummary>,
    result: &BulkCheckResult,
    source: Option<DecisionSource>,
) {
    let mut summary = summary.lock().unwrap_or_else(PoisonError::into_inner);
    if result.authorized {
        summary.authorized += 1;
    } else {
        summary.not_authorized += 1;
    }
    match source {
        Some(DecisionSource::Cache) => summary.cache_hits += 1,
        Some(DecisionSource::Repository) => summary.cache_misses += 1,
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        InMemoryEntitlementCache, InMemoryEntitlementRepository, InMemoryEventBus,
    };
    use crate::config::EntitlementConfig;
    use crate::domain::entitlement::{EntitlementStatus, NewEntitlement};
    use crate::domain::foundation::{EntitlementId, PlanId, StatusClass, SubscriptionId, Timestamp};
    use crate::ports::EntitlementRepository;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    /// Repository that records peak concurrency and can stall or fail lookups.
    struct TimedRepository {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
        fail_feature: Option<String>,
    }

    impl TimedRepository {
        fn new(delay: Duration) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                delay,
                fail_feature: None,
            }
        }

        fn failing_on(feature: &str) -> Self {
            Self {
                fail_feature: Some(feature.to_string()),
                ..Self::new(Duration::ZERO)
            }
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EntitlementRepository for TimedRepository {
        async fn check(
            &self,
            user_id: &UserId,
            feature_code: &str,
        ) -> Result<Option<Entitlement>, DomainError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_feature.as_deref() == Some(feature_code) {
                return Err(DomainError::new(ErrorCode::DatabaseError, "connection reset"));
            }
            if feature_code.starts_with("paid_") {
                return Ok(Some(entitlement(user_id, feature_code)));
            }
            Ok(None)
        }

        async fn list_by_user(&self, _: &UserId) -> Result<Vec<Entitlement>, DomainError> {
            Ok(Vec::new())
        }

        async fn list_by_subscription(
            &self,
            _: &SubscriptionId,
        ) -> Result<Vec<Entitlement>, DomainError> {
            Ok(Vec::new())
        }

        async fn insert(&self, entitlement: &Entitlement) -> Result<Entitlement, DomainError> {
            Ok(entitlement.clone())
        }

        async fn update_status(
            &self,
            _: &EntitlementId,
            _: EntitlementStatus,
        ) -> Result<Entitlement, DomainError> {
            Err(DomainError::new(ErrorCode::EntitlementNotFound, "not stored"))
        }

        async fn update_expiry(
            &self,
            _: &EntitlementId,
            _: Option<Timestamp>,
        ) -> Result<Entitlement, DomainError> {
            Err(DomainError::new(ErrorCode::EntitlementNotFound, "not stored"))
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn entitlement(user_id: &UserId, feature: &str) -> Entitlement {
        Entitlement::grant(
            NewEntitlement {
                user_id: user_id.clone(),
                family_id: None,
                feature_code: feature.to_string(),
                plan_id: PlanId::new(),
                subscription_id: None,
                expires_at: None,
                usage_limits: None,
                metadata: None,
            },
            Timestamp::now(),
        )
        .unwrap()
    }

    fn engine_with(repository: Arc<dyn EntitlementRepository>) -> EntitlementEngine {
        EntitlementEngine::new(
            repository,
            Arc::new(InMemoryEntitlementCache::new()),
            Arc::new(InMemoryEventBus::new()),
            EntitlementConfig::default(),
        )
    }

    fn command(features: &[&str]) -> BulkCheckCommand {
        BulkCheckCommand {
            user_id: "u1".to_string(),
            checks: features.iter().map(|f| BulkCheckItem::feature(*f)).collect(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Validation Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn rejects_empty_batch() {
        let engine = engine_with(Arc::new(InMemoryEntitlementRepository::new()));

        let err = engine
            .bulk_check_entitlements(command(&[]), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusClass::InvalidArgument);
    }

    #[tokio::test]
    async fn rejects_batch_over_limit() {
        let engine = engine_with(Arc::new(InMemoryEntitlementRepository::new()));
        let features: Vec<String> = (0..101).map(|i| format!("feature_{}", i)).collect();
        let refs: Vec<&str> = features.iter().map(String::as_str).collect();

        let err = engine
            .bulk_check_entitlements(command(&refs), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::BatchSizeExceeded);
        assert_eq!(err.status(), StatusClass::InvalidArgument);
    }

    #[tokio::test]
    async fn rejects_blank_user() {
        let engine = engine_with(Arc::new(InMemoryEntitlementRepository::new()));
        let mut cmd = command(&["paid_a"]);
        cmd.user_id = String::new();

        let err = engine
            .bulk_check_entitlements(cmd, CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusClass::InvalidArgument);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Processing Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn processes_full_batch_in_input_order() {
        let engine = engine_with(Arc::new(TimedRepository::new(Duration::from_millis(1))));
        let features: Vec<String> = (0..100)
            .map(|i| if i % 2 == 0 { format!("paid_{}", i) } else { format!("free_{}", i) })
            .collect();
        let refs: Vec<&str> = features.iter().map(String::as_str).collect();

        let response = engine
            .bulk_check_entitlements(command(&refs), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.results.len(), 100);
        assert_eq!(response.summary.total, 100);
        assert_eq!(response.summary.authorized + response.summary.not_authorized, 100);
        assert_eq!(response.summary.authorized, 50);
        for (result, feature) in response.results.iter().zip(&features) {
            assert_eq!(&result.feature_code, feature);
            assert_eq!(result.authorized, feature.starts_with("paid_"));
        }
    }

    #[tokio::test]
    async fn never_exceeds_concurrency_budget() {
        let repository = Arc::new(TimedRepository::new(Duration::from_millis(5)));
        let engine = engine_with(repository.clone());
        let features: Vec<String> = (0..40).map(|i| format!("paid_{}", i)).collect();
        let refs: Vec<&str> = features.iter().map(String::as_str).collect();

        engine
            .bulk_check_entitlements(command(&refs), CancellationToken::new())
            .await
            .unwrap();

        assert!(repository.peak() <= 10, "peak concurrency was {}", repository.peak());
        assert!(repository.peak() > 1);
    }

    #[tokio::test]
    async fn item_faults_do_not_abort_the_batch() {
        let engine = engine_with(Arc::new(TimedRepository::failing_on("paid_broken")));

        let response = engine
            .bulk_check_entitlements(
                command(&["paid_ok", "", "paid_broken", "free_x"]),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let reasons: Vec<_> = response.results.iter().map(|r| r.reason.as_deref()).collect();
        assert!(response.results[0].authorized);
        assert_eq!(
            reasons[1..],
            [
                Some("feature_code is required"),
                Some("Internal error checking entitlement"),
                Some("No active entitlement found"),
            ]
        );
        assert_eq!(response.summary.authorized, 1);
        assert_eq!(response.summary.not_authorized, 3);
    }

    #[tokio::test]
    async fn counts_cache_hits_on_repeat() {
        let engine = engine_with(Arc::new(TimedRepository::new(Duration::ZERO)));

        let first = engine
            .bulk_check_entitlements(command(&["paid_a", "free_b"]), CancellationToken::new())
            .await
            .unwrap();
        let second = engine
            .bulk_check_entitlements(command(&["paid_a", "free_b"]), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!((first.summary.cache_hits, first.summary.cache_misses), (0, 2));
        assert_eq!((second.summary.cache_hits, second.summary.cache_misses), (2, 0));
        assert!(second.results[0].authorized);
        assert!(!second.results[1].authorized);
    }

    #[tokio::test]
    async fn denied_items_carry_upgrade_url_and_authorized_items_echo_metadata() {
        let engine = engine_with(Arc::new(TimedRepository::new(Duration::ZERO)));
        let mut cmd = command(&["paid_a", "free_b"]);
        cmd.checks[0].metadata = Some(json!({"source": "editor"}));
        cmd.checks[1].metadata = Some(json!({"source": "editor"}));

        let response = engine
            .bulk_check_entitlements(cmd, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.results[0].metadata, Some(json!({"source": "editor"})));
        assert!(response.results[0].upgrade_url.is_none());
        assert_eq!(response.results[1].metadata, None);
        assert_eq!(
            response.results[1].upgrade_url.as_deref(),
            Some("https://app.example.com/checkout/free_b")
        );
    }

    #[tokio::test]
    async fn cancelled_batch_returns_explicit_failures() {
        let engine = engine_with(Arc::new(TimedRepository::new(Duration::from_secs(30))));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let response = engine
            .bulk_check_entitlements(command(&["paid_a", "paid_b", "paid_c"]), cancel)
            .await
            .unwrap();

        assert_eq!(response.results.len(), 3);
        for result in &response.results {
            assert!(!result.authorized);
            assert_eq!(result.reason.as_deref(), Some("check cancelled"));
        }
        assert_eq!(response.summary.not_authorized, 3);
    }
}

//! EntitlementEngine - cache-aside authorization checks and entitlement grants.
//!
//! # Check algorithm
//!
//! 1. A negative cache marker denies immediately.
//! 2. A positive cache hit is re-validated and must belong to the requested
//!    (user, feature); otherwise it is evicted and the repository consulted.
//! 3. Repository results populate the cache: valid grants positively,
//!    missing or invalid grants negatively.
//!
//! Cache faults never reach callers. They are logged and treated as misses.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::application::support::publish_best_effort;
use crate::config::EntitlementConfig;
use crate::domain::entitlement::{
    Entitlement, EntitlementAction, EntitlementStatus, EntitlementUpdated, NewEntitlement,
};
use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId, ValidationError};
use crate::ports::{CacheLookup, EntitlementCache, EntitlementRepository, EventPublisher};

pub(crate) const REASON_NOT_FOUND: &str = "No active entitlement found";
pub(crate) const REASON_INVALID: &str = "Entitlement expired or inactive";

/// Outcome of a single authorization check.
///
/// A denial is a normal result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitlementDecision {
    pub allowed: bool,
    pub entitlement: Option<Entitlement>,
    pub reason: Option<String>,
    pub upgrade_url: Option<String>,
}

impl EntitlementDecision {
    fn allowed(entitlement: Entitlement) -> Self {
        Self {
            allowed: true,
            entitlement: Some(entitlement),
            reason: None,
            upgrade_url: None,
        }
    }
}

/// Which layer answered a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecisionSource {
    Cache,
    Repository,
}

/// Counts from revoking the entitlements of one subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevocationSummary {
    pub revoked: usize,
    pub failed: usize,
}

pub struct EntitlementEngine {
    repository: Arc<dyn EntitlementRepository>,
    cache: Arc<dyn EntitlementCache>,
    publisher: Arc<dyn EventPublisher>,
    pub(crate) config: EntitlementConfig,
}

impl EntitlementEngine {
    pub fn new(
        repository: Arc<dyn EntitlementRepository>,
        cache: Arc<dyn EntitlementCache>,
        publisher: Arc<dyn EventPublisher>,
        config: EntitlementConfig,
    ) -> Self {
        Self {
            repository,
            cache,
            publisher,
            config,
        }
    }

    /// Decides whether `user_id` may use `feature_code` right now.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if either argument is blank
    /// - `DatabaseError` if the repository lookup fails
    pub async fn check_entitlement(
        &self,
        user_id: &str,
        feature_code: &str,
    ) -> Result<EntitlementDecision, DomainError> {
        let user_id = UserId::new(user_id)?;
        require_feature_code(feature_code)?;

        let (decision, _) = self.evaluate(&user_id, feature_code).await?;
        Ok(decision)
    }

    /// Grants a new entitlement and clears any cached answer for it.
    pub async fn create_entitlement(
        &self,
        input: NewEntitlement,
    ) -> Result<Entitlement, DomainError> {
        let entitlement = Entitlement::grant(input, Timestamp::now())?;
        let stored = self
            .repository
            .insert(&entitlement)
            .await
            .map_err(|e| e.context("create entitlement"))?;

        let event = EntitlementUpdated {
            entitlement_id: stored.id,
            user_id: stored.user_id.clone(),
            feature_code: stored.feature_code.clone(),
            action: EntitlementAction::Created,
            occurred_at: stored.created_at,
        };
        publish_best_effort(self.publisher.as_ref(), &event, &stored.user_id).await;

        self.invalidate(&stored.user_id, &stored.feature_code).await;

        info!(
            user_id = %stored.user_id,
            feature_code = %stored.feature_code,
            entitlement_id = %stored.id,
            "entitlement created"
        );
        Ok(stored)
    }

    pub async fn list_user_entitlements(
        &self,
        user_id: &str,
    ) -> Result<Vec<Entitlement>, DomainError> {
        let user_id = UserId::new(user_id)?;
        self.repository
            .list_by_user(&user_id)
            .await
            .map_err(|e| e.context("list user entitlements"))
    }

    /// Drops any cached answer, positive or negative, for (user, feature).
    pub async fn invalidate(&self, user_id: &UserId, feature_code: &str) {
        if let Err(error) = self.cache.delete(user_id, feature_code).await {
            warn!(
                user_id = %user_id,
                feature_code,
                error = %error,
                "failed to invalidate entitlement cache"
            );
        }
    }

    /// Revokes every active entitlement granted under `subscription_id`.
    ///
    /// Individual failures are logged and counted; they do not stop the
    /// remaining revocations.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` if the entitlements cannot be listed
    pub async fn revoke_subscription_entitlements(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<RevocationSummary, DomainError> {
        let entitlements = self
            .repository
            .list_by_subscription(subscription_id)
            .await
            .map_err(|e| e.context("list subscription entitlements"))?;

        let mut summary = RevocationSummary::default();
        for entitlement in entitlements {
            if entitlement.status == EntitlementStatus::Revoked {
                continue;
            }

            match self
                .repository
                .update_status(&entitlement.id, EntitlementStatus::Revoked)
                .await
            {
                Ok(revoked) => {
                    summary.revoked += 1;
                    self.invalidate(&revoked.user_id, &revoked.feature_code).await;

                    let event = EntitlementUpdated {
                        entitlement_id: revoked.id,
                        user_id: revoked.user_id.clone(),
                        feature_code: revoked.feature_code.clone(),
                        action: EntitlementAction::Revoked,
                        occurred_at: revoked.updated_at,
                    };
                    publish_best_effort(self.publisher.as_ref(), &event, &revoked.user_id).await;
                }
                Err(err) => {
                    summary.failed += 1;
                    error!(
                        subscription_id = %subscription_id,
                        entitlement_id = %entitlement.id,
                        error = %err,
                        "failed to revoke entitlement"
                    );
                }
            }
        }

        Ok(summary)
    }

    /// Runs the cache-aside lookup for an already validated (user, feature).
    pub(crate) async fn evaluate(
        &self,
        user_id: &UserId,
        feature_code: &str,
    ) -> Result<(EntitlementDecision, DecisionSource), DomainError> {
        let now = Timestamp::now();

        match self.cache.get(user_id, feature_code).await {
            Ok(CacheLookup::NegativeHit) => {
                debug!(user_id = %user_id, feature_code, "negative cache hit");
                return Ok((self.denied(feature_code, REASON_NOT_FOUND), DecisionSource::Cache));
            }
            Ok(CacheLookup::Hit(entitlement))
                if entitlement.grants(user_id, feature_code) && entitlement.is_valid_at(now) =>
            {
                return Ok((EntitlementDecision::allowed(entitlement), DecisionSource::Cache));
            }
            Ok(CacheLookup::Hit(_)) => {
                debug!(user_id = %user_id, feature_code, "evicting stale cached entitlement");
                self.invalidate(user_id, feature_code).await;
            }
            Ok(CacheLookup::Miss) => {}
            Err(error) => {
                warn!(
                    user_id = %user_id,
                    feature_code,
                    error = %error,
                    "failed to read entitlement cache"
                );
            }
        }

        let found = self
            .repository
            .check(user_id, feature_code)
            .await
            .map_err(|e| e.context("check entitlement"))?;

        let decision = match found {
            Some(entitlement) if entitlement.is_valid_at(now) => {
                self.remember(&entitlement).await;
                EntitlementDecision::allowed(entitlement)
            }
            Some(_) => {
                self.remember_denial(user_id, feature_code).await;
                self.denied(feature_code, REASON_INVALID)
            }
            None => {
                self.remember_denial(user_id, feature_code).await;
                self.denied(feature_code, REASON_NOT_FOUND)
            }
        };

        Ok((decision, DecisionSource::Repository))
    }

    pub(crate) fn upgrade_url(&self, feature_code: &str) -> String {
        format!(
            "{}/{}",
            self.config.upgrade_url_base.trim_end_matches('/'),
            feature_code
        )
    }

    fn denied(&self, feature_code: &str, reason: &str) -> EntitlementDecision {
        EntitlementDecision {
            allowed: false,
            entitlement: None,
            reason: Some(reason.to_string()),
            upgrade_url: Some(self.upgrade_url(feature_code)),
        }
    }

    async fn remember(&self, entitlement: &Entitlement) {
        if let Err(error) = self.cache.set(entitlement, self.config.cache_ttl()).await {
            warn!(
                user_id = %entitlement.user_id,
                feature_code = %entitlement.feature_code,
                error = %error,
                "failed to cache entitlement"
            );
        }
    }

    async fn remember_denial(&self, user_id: &UserId, feature_code: &str) {
        if let Err(error) = self
            .cache
            .set_negative(user_id, feature_code, self.config.negative_cache_ttl())
            .await
        {
            warn!(
                user_id = %user_id,
                feature_code,
                error = %error,
                "failed to cache entitlement denial"
            );
        }
    }
}

pub(crate) fn require_feature_code(feature_code: &str) -> Result<(), ValidationError> {
    if feature_code.trim().is_empty() {
        Err(ValidationError::empty_field("feature_code"))
    } else {
        Ok(())
    }
}

//! Entitlement repository port.
//!
//! The durable source of truth behind the entitlement cache.

use async_trait::async_trait;

use crate::domain::entitlement::{Entitlement, EntitlementStatus};
use crate::domain::foundation::{DomainError, EntitlementId, SubscriptionId, Timestamp, UserId};

#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Looks up the entitlement for (user, feature).
    ///
    /// Returns `None` if the user was never granted the feature. When several
    /// grants exist, implementations return the most recently granted one.
    async fn check(
        &self,
        user_id: &UserId,
        feature_code: &str,
    ) -> Result<Option<Entitlement>, DomainError>;

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Entitlement>, DomainError>;

    async fn list_by_subscription(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Vec<Entitlement>, DomainError>;

    /// Inserts a new entitlement and returns the stored record.
    async fn insert(&self, entitlement: &Entitlement) -> Result<Entitlement, DomainError>;

    /// # Errors
    ///
    /// - `EntitlementNotFound` if no entitlement has this id
    async fn update_status(
        &self,
        id: &EntitlementId,
        status: EntitlementStatus,
    ) -> Result<Entitlement, DomainError>;

    /// # Errors
    ///
    /// - `EntitlementNotFound` if no entitlement has this id
    async fn update_expiry(
        &self,
        id: &EntitlementId,
        expires_at: Option<Timestamp>,
    ) -> Result<Entitlement, DomainError>;
}

//! Subscription repository port.
//!
//! # Concurrency
//!
//! `update` is a compare-and-swap on `Subscription::version`: it succeeds
//! only if the stored version equals the version of the value passed in, and
//! stores the value with `version + 1`. A mismatch returns
//! `ErrorCode::ConcurrentModification` and leaves the store untouched.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{Subscription, SubscriptionStatus};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create(&self, subscription: &Subscription) -> Result<Subscription, DomainError>;

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError>;

    async fn find_by_status(
        &self,
        status: SubscriptionStatus,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Version-checked update. Returns the stored subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the subscription does not exist
    /// - `ConcurrentModification` if the stored version differs
    async fn update(&self, subscription: &Subscription) -> Result<Subscription, DomainError>;

    /// Active subscriptions whose current period ends at or before `cutoff`.
    async fn find_expiring_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;

    async fn find_active(&self) -> Result<Vec<Subscription>, DomainError>;
}

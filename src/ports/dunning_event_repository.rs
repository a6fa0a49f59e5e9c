//! Dunning event repository port.
//!
//! `update` follows the same version compare-and-swap contract as
//! `SubscriptionRepository::update`.

use async_trait::async_trait;

use crate::domain::dunning::{DunningEvent, DunningStatus};
use crate::domain::foundation::{DomainError, DunningEventId, Timestamp, UserId};

#[async_trait]
pub trait DunningEventRepository: Send + Sync {
    async fn insert(&self, event: &DunningEvent) -> Result<DunningEvent, DomainError>;

    async fn find_by_id(&self, id: &DunningEventId) -> Result<Option<DunningEvent>, DomainError>;

    /// # Errors
    ///
    /// - `DunningEventNotFound` if the event does not exist
    /// - `ConcurrentModification` if the stored version differs
    async fn update(&self, event: &DunningEvent) -> Result<DunningEvent, DomainError>;

    /// Events for a user, newest first, optionally filtered by status.
    async fn find_by_user(
        &self,
        user_id: &UserId,
        status: Option<DunningStatus>,
    ) -> Result<Vec<DunningEvent>, DomainError>;

    /// Active events whose `next_retry_at <= now`, oldest due first.
    async fn find_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<DunningEvent>, DomainError>;
}

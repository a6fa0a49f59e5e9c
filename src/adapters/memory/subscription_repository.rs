//! In-memory subscription repository with version-checked updates.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select(&self, keep: impl Fn(&Subscription) -> bool) -> Vec<Subscription> {
        let mut found: Vec<_> = self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| keep(s))
            .cloned()
            .collect();
        found.sort_by_key(|s| s.created_at);
        found
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn create(&self, subscription: &Subscription) -> Result<Subscription, DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions.contains_key(&subscription.id) {
            return Err(DomainError::validation("id", "subscription already exists"));
        }
        subscriptions.insert(subscription.id, subscription.clone());
        Ok(subscription.clone())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.subscriptions.read().await.get(id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .find(|s| s.external_subscription_id == external_id)
            .cloned())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        Ok(self.select(|s| &s.user_id == user_id).await)
    }

    async fn find_by_status(
        &self,
        status: SubscriptionStatus,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self.select(|s| s.status == status).await)
    }

    async fn update(&self, subscription: &Subscription) -> Result<Subscription, DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        let stored = subscriptions.get_mut(&subscription.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("subscription {} not found", subscription.id),
            )
        })?;

        if stored.version != subscription.version {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "subscription {} was modified concurrently (expected version {}, found {})",
                    subscription.id, subscription.version, stored.version
                ),
            ));
        }

        let mut next = subscription.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn find_expiring_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let mut found = self
            .select(|s| {
                s.status == SubscriptionStatus::Active && !s.current_period_end.is_after(&cutoff)
            })
            .await;
        found.sort_by_key(|s| s.current_period_end);
        Ok(found)
    }

    async fn find_active(&self) -> Result<Vec<Subscription>, DomainError> {
        self.find_by_status(SubscriptionStatus::Active).await
    }
}

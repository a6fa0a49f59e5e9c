//! In-memory entitlement repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::domain::entitlement::{Entitlement, EntitlementStatus};
use crate::domain::foundation::{
    DomainError, EntitlementId, ErrorCode, SubscriptionId, Timestamp, UserId,
};
use crate::ports::EntitlementRepository;

#[derive(Debug, Default)]
pub struct InMemoryEntitlementRepository {
    entitlements: RwLock<HashMap<EntitlementId, Entitlement>>,
    check_calls: AtomicUsize,
}

impl InMemoryEntitlementRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `check` lookups served, for asserting cache behaviour.
    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub async fn get(&self, id: &EntitlementId) -> Option<Entitlement> {
        self.entitlements.read().await.get(id).cloned()
    }

    async fn modify(
        &self,
        id: &EntitlementId,
        apply: impl FnOnce(&mut Entitlement),
    ) -> Result<Entitlement, DomainError> {
        let mut entitlements = self.entitlements.write().await;
        let entitlement = entitlements.get_mut(id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::EntitlementNotFound,
                format!("entitlement {} not found", id),
            )
        })?;
        apply(entitlement);
        entitlement.updated_at = Timestamp::now();
        Ok(entitlement.clone())
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryEntitlementRepository {
    async fn check(
        &self,
        user_id: &UserId,
        feature_code: &str,
    ) -> Result<Option<Entitlement>, DomainError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entitlements
            .read()
            .await
            .values()
            .filter(|e| &e.user_id == user_id && e.feature_code == feature_code)
            .max_by_key(|e| e.granted_at)
            .cloned())
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Entitlement>, DomainError> {
        let mut found: Vec<_> = self
            .entitlements
            .read()
            .await
            .values()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.feature_code
                .cmp(&b.feature_code)
                .then(a.granted_at.cmp(&b.granted_at))
        });
        Ok(found)
    }

    async fn list_by_subscription(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Vec<Entitlement>, DomainError> {
        let mut found: Vec<_> = self
            .entitlements
            .read()
            .await
            .values()
            .filter(|e| e.subscription_id.as_ref() == Some(subscription_id))
            .cloned()
            .collect();
        found.sort_by_key(|e| e.granted_at);
        Ok(found)
    }

    async fn insert(&self, entitlement: &Entitlement) -> Result<Entitlement, DomainError> {
        self.entitlements
            .write()
            .await
            .insert(entitlement.id, entitlement.clone());
        Ok(entitlement.clone())
    }

    async fn update_status(
        &self,
        id: &EntitlementId,
        status: EntitlementStatus,
    ) -> Result<Entitlement, DomainError> {
        self.modify(id, |e| e.status = status).await
    }

    async fn update_expiry(
        &self,
        id: &EntitlementId,
        expires_at: Option<Timestamp>,
    ) -> Result<Entitlement, DomainError> {
        self.modify(id, |e| e.expires_at = expires_at).await
    }
}

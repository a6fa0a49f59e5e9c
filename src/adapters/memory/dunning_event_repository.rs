//! In-memory dunning event repository with version-checked updates.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::dunning::{DunningEvent, DunningStatus};
use crate::domain::foundation::{DomainError, DunningEventId, ErrorCode, Timestamp, UserId};
use crate::ports::DunningEventRepository;

#[derive(Debug, Default)]
pub struct InMemoryDunningEventRepository {
    events: RwLock<HashMap<DunningEventId, DunningEvent>>,
}

impl InMemoryDunningEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DunningEventRepository for InMemoryDunningEventRepository {
    async fn insert(&self, event: &DunningEvent) -> Result<DunningEvent, DomainError> {
        let mut events = self.events.write().await;
        if events.contains_key(&event.id) {
            return Err(DomainError::validation("id", "dunning event already exists"));
        }
        events.insert(event.id, event.clone());
        Ok(event.clone())
    }

    async fn find_by_id(&self, id: &DunningEventId) -> Result<Option<DunningEvent>, DomainError> {
        Ok(self.events.read().await.get(id).cloned())
    }

    async fn update(&self, event: &DunningEvent) -> Result<DunningEvent, DomainError> {
        let mut events = self.events.write().await;
        let stored = events.get_mut(&event.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DunningEventNotFound,
                format!("dunning event {} not found", event.id),
            )
        })?;

        if stored.version != event.version {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "dunning event {} was modified concurrently (expected version {}, found {})",
                    event.id, event.version, stored.version
                ),
            ));
        }

        let mut next = event.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn find_by_user(
        &self,
        user_id: &UserId,
        status: Option<DunningStatus>,
    ) -> Result<Vec<DunningEvent>, DomainError> {
        let mut found: Vec<_> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| &e.user_id == user_id && status.map_or(true, |s| e.status == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<DunningEvent>, DomainError> {
        let mut due: Vec<_> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|e| e.next_retry_at);
        due.truncate(limit);
        Ok(due)
    }
}

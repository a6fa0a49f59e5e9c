//! Dunning domain events.
//!
//! Every activity carries a snapshot of the dunning event after the change.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainEvent, DunningEventId, PaymentId, SubscriptionId, Timestamp, UserId,
};

use super::{DunningEvent, DunningEventType, DunningStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DunningSnapshot {
    pub dunning_event_id: DunningEventId,
    pub user_id: UserId,
    pub family_id: Option<String>,
    pub payment_id: PaymentId,
    pub subscription_id: Option<SubscriptionId>,
    pub event_type: DunningEventType,
    pub status: DunningStatus,
    pub amount: i64,
    pub currency: String,
    pub failure_reason: String,
    pub retry_count: u32,
    pub next_retry_at: Option<Timestamp>,
    pub occurred_at: Timestamp,
}

impl From<&DunningEvent> for DunningSnapshot {
    fn from(event: &DunningEvent) -> Self {
        Self {
            dunning_event_id: event.id,
            user_id: event.user_id.clone(),
            family_id: event.family_id.clone(),
            payment_id: event.payment_id.clone(),
            subscription_id: event.subscription_id,
            event_type: event.event_type,
            status: event.status,
            amount: event.amount,
            currency: event.currency.clone(),
            failure_reason: event.failure_reason.clone(),
            retry_count: event.retry_count,
            next_retry_at: event.next_retry_at,
            occurred_at: event.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "activity", rename_all = "snake_case")]
pub enum DunningActivity {
    PaymentFailed(DunningSnapshot),
    RetryAttempted(DunningSnapshot),
    RetryResult {
        #[serde(flatten)]
        snapshot: DunningSnapshot,
        success: bool,
    },
    Escalated(DunningSnapshot),
    Cancelled {
        #[serde(flatten)]
        snapshot: DunningSnapshot,
        reason: String,
    },
}

impl DunningActivity {
    pub fn snapshot(&self) -> &DunningSnapshot {
        match self {
            DunningActivity::PaymentFailed(snapshot)
            | DunningActivity::RetryAttempted(snapshot)
            | DunningActivity::Escalated(snapshot)
            | DunningActivity::RetryResult { snapshot, .. }
            | DunningActivity::Cancelled { snapshot, .. } => snapshot,
        }
    }
}

impl DomainEvent for DunningActivity {
    fn event_type(&self) -> &'static str {
        match self {
            DunningActivity::PaymentFailed(_) => "dunning.payment_failed",
            DunningActivity::RetryAttempted(_) => "dunning.retry_attempted",
            DunningActivity::RetryResult { .. } => "dunning.retry_result",
            DunningActivity::Escalated(_) => "dunning.escalated",
            DunningActivity::Cancelled { .. } => "dunning.cancelled",
        }
    }

    fn aggregate_id(&self) -> String {
        self.snapshot().dunning_event_id.to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "DunningEvent"
    }

    fn occurred_at(&self) -> Timestamp {
        self.snapshot().occurred_at
    }
}

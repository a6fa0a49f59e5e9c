//! Payment records as seen by the dunning process.
//!
//! Payments are owned by the payment service; this crate only reads them
//! and updates their status and metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::domain::foundation::{PaymentId, SubscriptionId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
    Other(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Other(s) => s,
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => PaymentStatus::Pending,
            "succeeded" => PaymentStatus::Succeeded,
            "failed" => PaymentStatus::Failed,
            "refunded" => PaymentStatus::Refunded,
            _ => PaymentStatus::Other(s),
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub subscription_id: Option<SubscriptionId>,

    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub metadata: Map<String, JsonValue>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Marks the payment failed and links it to the dunning cycle handling it.
    pub fn mark_failed(&mut self, reason: &str, dunning_event_id: &str, now: Timestamp) {
        self.status = PaymentStatus::Failed;
        self.metadata
            .insert("failure_reason".to_string(), JsonValue::from(reason));
        self.metadata
            .insert("dunning_event_id".to_string(), JsonValue::from(dunning_event_id));
        self.updated_at = now;
    }

    /// Marks the payment succeeded after `retry_count` dunning retries.
    pub fn mark_retry_succeeded(&mut self, retry_count: u32, now: Timestamp) {
        self.status = PaymentStatus::Succeeded;
        self.metadata
            .insert("retry_succeeded".to_string(), JsonValue::Bool(true));
        self.metadata
            .insert("retry_count".to_string(), JsonValue::from(retry_count));
        self.updated_at = now;
    }
}

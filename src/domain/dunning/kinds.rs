//! Dunning event tags and cycle status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Audit tag recording the last thing that happened in a dunning cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DunningEventType {
    PaymentFailed,
    RetryScheduled,
    RetryAttempted,
    RetrySucceeded,
    RetryFailed,
    SubscriptionSuspended,
    SubscriptionCancelled,
    DunningEscalated,
}

impl DunningEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DunningEventType::PaymentFailed => "payment_failed",
            DunningEventType::RetryScheduled => "retry_scheduled",
            DunningEventType::RetryAttempted => "retry_attempted",
            DunningEventType::RetrySucceeded => "retry_succeeded",
            DunningEventType::RetryFailed => "retry_failed",
            DunningEventType::SubscriptionSuspended => "subscription_suspended",
            DunningEventType::SubscriptionCancelled => "subscription_cancelled",
            DunningEventType::DunningEscalated => "dunning_escalated",
        }
    }
}

impl fmt::Display for DunningEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a dunning cycle. Everything but `Active` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DunningStatus {
    Active,
    Resolved,
    Cancelled,
    Escalated,
}

impl DunningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DunningStatus::Active => "active",
            DunningStatus::Resolved => "resolved",
            DunningStatus::Cancelled => "cancelled",
            DunningStatus::Escalated => "escalated",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, DunningStatus::Active)
    }
}

impl fmt::Display for DunningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DunningStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(DunningStatus::Active),
            "resolved" => Ok(DunningStatus::Resolved),
            "cancelled" => Ok(DunningStatus::Cancelled),
            "escalated" => Ok(DunningStatus::Escalated),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown dunning status '{}'", other),
            )),
        }
    }
}

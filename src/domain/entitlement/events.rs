//! Entitlement domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainEvent, EntitlementId, Timestamp, UserId};

/// What happened to the entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementAction {
    Created,
    Revoked,
}

/// Emitted whenever an entitlement is granted or revoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitlementUpdated {
    pub entitlement_id: EntitlementId,
    pub user_id: UserId,
    pub feature_code: String,
    pub action: EntitlementAction,
    pub occurred_at: Timestamp,
}

impl DomainEvent for EntitlementUpdated {
    fn event_type(&self) -> &'static str {
        "entitlement.updated"
    }

    fn aggregate_id(&self) -> String {
        self.entitlement_id.to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "Entitlement"
    }

    fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }
}

//! Entitlement entity.
//!
//! An entitlement grants one user access to one feature under one plan.
//! Validity is derived from status and expiry on every read and is never
//! stored.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::foundation::{
    DomainError, EntitlementId, ErrorCode, PlanId, SubscriptionId, Timestamp, UserId,
};

use super::EntitlementStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: EntitlementId,
    pub user_id: UserId,
    pub family_id: Option<String>,
    pub feature_code: String,
    pub plan_id: PlanId,
    pub subscription_id: Option<SubscriptionId>,
    pub status: EntitlementStatus,
    pub granted_at: Timestamp,
    pub expires_at: Option<Timestamp>,

    /// Opaque usage limits, interpreted by the quota service.
    pub usage_limits: Option<JsonValue>,
    pub metadata: Option<JsonValue>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for granting a new entitlement.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntitlement {
    pub user_id: UserId,
    pub family_id: Option<String>,
    pub feature_code: String,
    pub plan_id: PlanId,
    pub subscription_id: Option<SubscriptionId>,
    pub expires_at: Option<Timestamp>,
    pub usage_limits: Option<JsonValue>,
    pub metadata: Option<JsonValue>,
}

impl Entitlement {
    /// Grants a new active entitlement.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the feature code is blank
    pub fn grant(input: NewEntitlement, now: Timestamp) -> Result<Self, DomainError> {
        if input.feature_code.trim().is_empty() {
            return Err(DomainError::new(
                ErrorCode::EmptyField,
                "feature_code is required",
            ));
        }

        Ok(Self {
            id: EntitlementId::new(),
            user_id: input.user_id,
            family_id: input.family_id,
            feature_code: input.feature_code,
            plan_id: input.plan_id,
            subscription_id: input.subscription_id,
            status: EntitlementStatus::Active,
            granted_at: now,
            expires_at: input.expires_at,
            usage_limits: input.usage_limits,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true if the entitlement grants access at `now`.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        self.status.is_active() && self.expires_at.map_or(true, |exp| exp.is_after(&now))
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Timestamp::now())
    }

    /// Returns true if this record is the grant for (user, feature).
    pub fn grants(&self, user_id: &UserId, feature_code: &str) -> bool {
        self.user_id == *user_id && self.feature_code == feature_code
    }
}

//! Subscription domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainEvent, PlanId, SubscriptionId, Timestamp, UserId};

use super::SubscriptionStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubscriptionEvent {
    Created {
        subscription_id: SubscriptionId,
        user_id: UserId,
        plan_id: PlanId,
        current_period_end: Timestamp,
        occurred_at: Timestamp,
    },

    StatusChanged {
        subscription_id: SubscriptionId,
        user_id: UserId,
        old_status: SubscriptionStatus,
        new_status: SubscriptionStatus,
        reason: String,
        occurred_at: Timestamp,
    },

    Renewed {
        subscription_id: SubscriptionId,
        user_id: UserId,
        current_period_start: Timestamp,
        current_period_end: Timestamp,
        occurred_at: Timestamp,
    },
}

impl SubscriptionEvent {
    pub fn subscription_id(&self) -> SubscriptionId {
        match self {
            SubscriptionEvent::Created { subscription_id, .. }
            | SubscriptionEvent::StatusChanged { subscription_id, .. }
            | SubscriptionEvent::Renewed { subscription_id, .. } => *subscription_id,
        }
    }

    pub fn user_id(&self) -> &UserId {
        match self {
            SubscriptionEvent::Created { user_id, .. }
            | SubscriptionEvent::StatusChanged { user_id, .. }
            | SubscriptionEvent::Renewed { user_id, .. } => user_id,
        }
    }
}

impl DomainEvent for SubscriptionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SubscriptionEvent::Created { .. } => "subscription.created",
            SubscriptionEvent::StatusChanged { .. } => "subscription.status_changed",
            SubscriptionEvent::Renewed { .. } => "subscription.renewed",
        }
    }

    fn aggregate_id(&self) -> String {
        self.subscription_id().to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "Subscription"
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            SubscriptionEvent::Created { occurred_at, .. }
            | SubscriptionEvent::StatusChanged { occurred_at, .. }
            | SubscriptionEvent::Renewed { occurred_at, .. } => *occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SerializableDomainEvent;

    #[test]
    fn status_changed_envelope_carries_both_statuses() {
        let event = SubscriptionEvent::StatusChanged {
            subscription_id: SubscriptionId::new(),
            user_id: UserId::new("u1").unwrap(),
            old_status: SubscriptionStatus::Active,
            new_status: SubscriptionStatus::PastDue,
            reason: "card_declined".to_string(),
            occurred_at: Timestamp::now(),
        };

        let env = event.to_envelope();
        assert_eq!(env.event_type, "subscription.status_changed");
        assert_eq!(env.aggregate_type, "Subscription");
        assert_eq!(env.payload["kind"], "status_changed");
        assert_eq!(env.payload["old_status"], "active");
        assert_eq!(env.payload["new_status"], "past_due");
        assert_eq!(env.payload["reason"], "card_declined");
    }
}

//! Subscription status state machine.
//!
//! | From | To |
//! |------|----|
//! | active | past_due, suspended, cancelled |
//! | past_due | active, suspended, cancelled |
//! | suspended | active, cancelled |
//! | cancelled | expired |
//! | expired | (terminal) |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,

    /// A payment failed; the dunning cycle is running.
    PastDue,

    Suspended,
    Cancelled,

    /// Subscription ended and its entitlements were revoked.
    Expired,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 5] = [
        SubscriptionStatus::Active,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::Suspended,
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }

    /// Next step on the payment-failure escalation ladder.
    ///
    /// Returns `None` when a further failure changes nothing.
    pub fn on_payment_failure(&self) -> Option<SubscriptionStatus> {
        match self {
            SubscriptionStatus::Active => Some(SubscriptionStatus::PastDue),
            SubscriptionStatus::PastDue => Some(SubscriptionStatus::Suspended),
            SubscriptionStatus::Suspended => Some(SubscriptionStatus::Cancelled),
            SubscriptionStatus::Cancelled | SubscriptionStatus::Expired => None,
        }
    }

    /// Status after a successful payment, if it changes anything.
    pub fn on_payment_success(&self) -> Option<SubscriptionStatus> {
        match self {
            SubscriptionStatus::PastDue | SubscriptionStatus::Suspended => {
                Some(SubscriptionStatus::Active)
            }
            _ => None,
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Active => vec![PastDue, Suspended, Cancelled],
            PastDue => vec![Active, Suspended, Cancelled],
            Suspended => vec![Active, Cancelled],
            Cancelled => vec![Expired],
            Expired => vec![],
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format(
                    "status",
                    format!("unknown subscription status '{}'", s),
                )
            })
    }
}

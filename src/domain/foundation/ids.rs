//! Strongly-typed identifier value objects.
//!
//! Internal aggregates are keyed by UUIDs. Users and payments are owned by
//! upstream systems, so their identifiers are opaque non-empty strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier, rejecting empty or blank values.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Ok(Self(id))
            }

            /// Returns the inner string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an entitlement grant.
    EntitlementId
);

uuid_id!(
    /// Unique identifier for a subscription.
    SubscriptionId
);

uuid_id!(
    /// Identifier of the billing plan a subscription is on.
    PlanId
);

uuid_id!(
    /// Unique identifier for a dunning event.
    DunningEventId
);

string_id!(
    /// Identifier of the user who owns subscriptions and entitlements.
    UserId,
    "user_id"
);

string_id!(
    /// Identifier of a payment record in the payment system.
    PaymentId,
    "payment_id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_generate_unique_values() {
        assert_ne!(SubscriptionId::new(), SubscriptionId::new());
        assert_ne!(DunningEventId::new(), DunningEventId::new());
    }

    #[test]
    fn uuid_id_parses_from_string() {
        let uuid = Uuid::new_v4();
        let id: EntitlementId = uuid.to_string().parse().unwrap();
        assert_eq!(id.as_uuid(), &uuid);
    }

    #[test]
    fn uuid_id_rejects_malformed_string() {
        assert!("not-a-uuid".parse::<PlanId>().is_err());
    }

    #[test]
    fn uuid_id_serializes_transparently() {
        let uuid = Uuid::new_v4();
        let id = SubscriptionId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }

    #[test]
    fn user_id_accepts_non_empty_value() {
        let id = UserId::new("user-42").unwrap();
        assert_eq!(id.as_str(), "user-42");
        assert_eq!(id.to_string(), "user-42");
    }

    #[test]
    fn user_id_rejects_blank_value() {
        assert_eq!(UserId::new("   "), Err(ValidationError::empty_field("user_id")));
    }

    #[test]
    fn payment_id_rejects_empty_value() {
        assert_eq!(PaymentId::new(""), Err(ValidationError::empty_field("payment_id")));
    }
}

//! Entitlement status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an entitlement grant.
///
/// Only `active` grants access. Stores may hold statuses this crate does not
/// know about; those are preserved verbatim and never grant access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntitlementStatus {
    Active,
    Revoked,
    Other(String),
}

impl EntitlementStatus {
    pub fn as_str(&self) -> &str {
        match self {
            EntitlementStatus::Active => "active",
            EntitlementStatus::Revoked => "revoked",
            EntitlementStatus::Other(s) => s,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, EntitlementStatus::Active)
    }
}

impl From<String> for EntitlementStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => EntitlementStatus::Active,
            "revoked" => EntitlementStatus::Revoked,
            _ => EntitlementStatus::Other(s),
        }
    }
}

impl From<EntitlementStatus> for String {
    fn from(status: EntitlementStatus) -> Self {
        match status {
            EntitlementStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EntitlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

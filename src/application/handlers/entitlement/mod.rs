//! Entitlement authorization.
//!
//! - `EntitlementEngine` - single checks, grants, listing, revocation
//! - bulk checks with bounded concurrency

mod bulk_check;
mod engine;

pub use bulk_check::{
    BulkCheckCommand, BulkCheckItem, BulkCheckResponse, BulkCheckResult, BulkCheckSummary,
};
pub use engine::{EntitlementDecision, EntitlementEngine, RevocationSummary};

//! Application layer - services and the dunning scheduler.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;
mod support;

pub use handlers::{
    BulkCheckCommand, BulkCheckItem, BulkCheckResponse, BulkCheckResult, BulkCheckSummary,
    DunningManager, DunningScheduler, EntitlementDecision, EntitlementEngine,
    ProcessPaymentFailureCommand, RevocationSummary, SubscriptionLifecycleManager, TickReport,
    REASON_PAYMENT_FAILURE, REASON_PAYMENT_SUCCESSFUL,
};
pub use support::{with_deadline, CONFLICT_RETRY_ATTEMPTS};

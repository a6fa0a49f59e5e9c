//! Application handlers.
//!
//! Services that orchestrate domain operations across ports.

pub mod dunning;
pub mod entitlement;
pub mod subscription;

pub use dunning::{
    DunningManager, DunningScheduler, ProcessPaymentFailureCommand, TickReport,
    REASON_PAYMENT_FAILURE,
};
pub use entitlement::{
    BulkCheckCommand, BulkCheckItem, BulkCheckResponse, BulkCheckResult, BulkCheckSummary,
    EntitlementDecision, EntitlementEngine, RevocationSummary,
};
pub use subscription::{SubscriptionLifecycleManager, REASON_PAYMENT_SUCCESSFUL};

//! Subscription lifecycle.

mod lifecycle;

pub use lifecycle::{SubscriptionLifecycleManager, REASON_PAYMENT_SUCCESSFUL};

//! Dunning: retry bookkeeping, escalation and the background scheduler.

mod manager;
mod scheduler;

pub use manager::{DunningManager, ProcessPaymentFailureCommand, REASON_PAYMENT_FAILURE};
pub use scheduler::{DunningScheduler, TickReport};

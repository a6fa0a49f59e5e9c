//! Dunning domain - failed-payment remediation cycles.
//!
//! A `DunningEvent` opens when a payment fails, counts retry attempts against
//! a `RetryPolicy`, and ends `resolved`, `cancelled` or `escalated`.

mod aggregate;
mod events;
mod kinds;
mod policy;

pub use aggregate::{DunningEvent, NewDunningEvent, RetryResolution};
pub use events::{DunningActivity, DunningSnapshot};
pub use kinds::{DunningEventType, DunningStatus};
pub use policy::RetryPolicy;

//! Entitlement domain - feature grants and their validity rules.

mod aggregate;
mod events;
mod status;

pub use aggregate::{Entitlement, NewEntitlement};
pub use events::{EntitlementAction, EntitlementUpdated};
pub use status::EntitlementStatus;

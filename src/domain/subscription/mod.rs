//! Subscription domain - billing relationships and their lifecycle.

mod aggregate;
mod events;
mod status;

pub use aggregate::{NewSubscription, Subscription};
pub use events::SubscriptionEvent;
pub use status::SubscriptionStatus;

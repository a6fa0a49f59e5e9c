//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, events, state machine)
//! - `entitlement` - Feature grants and the validity rule
//! - `subscription` - Subscription aggregate and its status state machine
//! - `dunning` - Failed-payment retry cycles and the retry ladder
//! - `payment` - Payment records touched by dunning

pub mod dunning;
pub mod entitlement;
pub mod foundation;
pub mod payment;
pub mod subscription;

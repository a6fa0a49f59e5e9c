//! Billing authorization backend.
//!
//! Decides whether a user may use a feature right now, drives subscriptions
//! through their payment-driven lifecycle, and runs dunning for failed
//! payments: retries on a fixed ladder, then escalation that suspends the
//! subscription.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

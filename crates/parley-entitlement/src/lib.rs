//! Entitlement resolution and daily quota tracking.
//!
//! This crate answers two questions for every chat request:
//!
//! 1. What is this user actually entitled to *right now*
//!    ([`resolve`]) — accounting for subscriptions that expired between
//!    requests, stale denormalized feature flags, and paid plans whose
//!    subscription lapsed but has not been swept yet.
//! 2. May this request consume a message, and how is the consumption
//!    recorded ([`QuotaTracker`]) — with the day-rollover and
//!    charge-on-success rules.

mod error;
mod quota;
mod resolver;

pub use error::EntitlementError;
pub use quota::{ConsumeOutcome, QuotaTracker, quota_remaining, should_reset};
pub use resolver::{DowngradeIntent, Entitlement, Resolution, resolve};

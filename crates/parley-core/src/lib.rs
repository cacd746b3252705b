//! Core types and constants shared across parley crates.
//!
//! This crate provides:
//! - Plan, subscription and feature-flag domain types
//! - The pricing and daily-limit tables
//! - Default configuration values
//! - Civil-date helpers for day-rollover and billing-period math
//! - Error classification constants for metrics/logging

pub mod date;
pub mod defaults;
pub mod errors;
pub mod id;
pub mod plan;
pub mod provider;

// Re-export commonly used items at crate root
pub use errors::*;
pub use plan::{
    Currency, FeatureFlags, PaymentMethod, PersonaKind, Plan, SubscriptionStatus,
    amount_tolerance, daily_limit, plan_from_amount, plan_price,
};
pub use provider::ProviderKind;

/// Project name.
pub const PROJECT_NAME: &str = "parley";
/// Project version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

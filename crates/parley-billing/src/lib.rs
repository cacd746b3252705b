//! Subscription lifecycle and payment handling.
//!
//! This crate owns every durable transition of a subscription:
//!
//! - `pending_activation → active` (email activation token flow)
//! - payment-confirmed creation (user + subscription + payment + audit in
//!   one atomic batch)
//! - `active → expired` (lazy downgrade and the periodic sweep)
//! - `active → cancelled` (immediate or end-of-period)
//!
//! plus amount validation against the plan price table and webhook
//! signature verification for the supported payment providers.

mod error;
mod lifecycle;
mod webhook;

pub use error::BillingError;
pub use lifecycle::{
    CreateOutcome, CreateSubscription, PendingSubscription, SubscriptionManager, validate_amount,
};
pub use webhook::{WebhookProvider, WebhookSecrets, WebhookVerifier};

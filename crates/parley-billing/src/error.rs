//! Billing error types.

use parley_store::StoreError;

/// Subscription/payment error.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Charged amount does not match the plan price within tolerance.
    #[error("payment amount does not match plan price (expected {expected} {currency})")]
    InvalidAmount {
        expected: f64,
        got: f64,
        currency: &'static str,
    },

    /// Unknown or unsupported payment method.
    #[error("invalid payment method: {0}")]
    InvalidPaymentMethod(String),

    /// The plan cannot be purchased (e.g. free).
    #[error("invalid subscription plan")]
    InvalidPlan,

    /// Referenced subscription does not exist.
    #[error("subscription not found")]
    NotFound,

    /// Subscription belongs to a different user.
    #[error("unauthorized")]
    Unauthorized,

    /// Activation token mismatch.
    #[error("invalid activation token")]
    InvalidToken,

    /// Subscription already activated (or no longer pending).
    #[error("subscription already activated or expired")]
    AlreadyActivated,

    /// Webhook signature verification failed.
    #[error("invalid webhook signature")]
    SignatureInvalid,

    /// Store failure.
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

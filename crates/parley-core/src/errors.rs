//! Error type constants for metrics and logging.
//!
//! These constants provide consistent error classification across all crates.

/// Authentication error (missing/invalid credential).
pub const ERROR_AUTH: &str = "auth";
/// Per-identity rate limit hit.
pub const ERROR_RATE_LIMIT: &str = "rate_limit";
/// Request payload validation error.
pub const ERROR_INPUT: &str = "input";
/// Daily quota exhausted.
pub const ERROR_QUOTA: &str = "quota";
/// All upstream providers failed.
pub const ERROR_PROVIDERS: &str = "providers";
/// Payment/billing validation error.
pub const ERROR_BILLING: &str = "billing";
/// Webhook signature verification failure.
pub const ERROR_SIGNATURE: &str = "signature";
/// Document store error.
pub const ERROR_STORE: &str = "store";
/// Configuration error.
pub const ERROR_CONFIG: &str = "config";
/// Unexpected internal error.
pub const ERROR_INTERNAL: &str = "internal";

//! Metrics collection and Prometheus exporter for parley.
//!
//! Provides metrics instrumentation for the chat backend: request counts,
//! quota rejections, provider attempts and failures, affinity cache
//! activity, and billing events.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter, exposing `/metrics` on `listen`.
///
/// Must be called from within a Tokio runtime; returns an error message
/// when the address is invalid or the recorder cannot be installed.
pub fn init_prometheus(listen: &str) -> Result<(), String> {
    let addr = listen
        .parse::<SocketAddr>()
        .map_err(|e| format!("metrics listen address '{listen}': {e}"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("prometheus exporter on {addr}: {e}"))
}

// ============================================================================
// Metric Names
// ============================================================================

/// Total number of HTTP requests handled.
pub const REQUESTS_TOTAL: &str = "parley_requests_total";
/// Total number of chat messages successfully served.
pub const CHAT_MESSAGES_TOTAL: &str = "parley_chat_messages_total";
/// Total number of requests rejected by the daily quota.
pub const QUOTA_REJECTED_TOTAL: &str = "parley_quota_rejected_total";
/// Total number of requests rejected by the rate limiter.
pub const RATE_LIMITED_TOTAL: &str = "parley_rate_limited_total";
/// Total number of upstream provider attempts.
pub const PROVIDER_ATTEMPTS_TOTAL: &str = "parley_provider_attempts_total";
/// Total number of dispatches that exhausted every provider.
pub const PROVIDER_EXHAUSTED_TOTAL: &str = "parley_provider_exhausted_total";
/// Total affinity cache hits.
pub const AFFINITY_HITS_TOTAL: &str = "parley_affinity_hits_total";
/// Total affinity cache misses.
pub const AFFINITY_MISSES_TOTAL: &str = "parley_affinity_misses_total";
/// Current affinity cache population.
pub const AFFINITY_SESSIONS: &str = "parley_affinity_sessions";
/// Total subscriptions created.
pub const SUBSCRIPTIONS_CREATED_TOTAL: &str = "parley_subscriptions_created_total";
/// Total subscriptions expired (sweep + lazy downgrade).
pub const SUBSCRIPTIONS_EXPIRED_TOTAL: &str = "parley_subscriptions_expired_total";
/// Total webhook deliveries received.
pub const WEBHOOKS_TOTAL: &str = "parley_webhooks_total";
/// Total webhook deliveries rejected (bad signature).
pub const WEBHOOKS_REJECTED_TOTAL: &str = "parley_webhooks_rejected_total";
/// Chat request duration histogram (seconds).
pub const CHAT_DURATION_SECONDS: &str = "parley_chat_duration_seconds";
/// Total number of errors by type.
pub const ERRORS_TOTAL: &str = "parley_errors_total";

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a handled HTTP request by route.
#[inline]
pub fn record_request(route: &'static str) {
    counter!(REQUESTS_TOTAL, "route" => route).increment(1);
}

/// Record a successfully served chat message.
#[inline]
pub fn record_chat_message(duration_secs: f64) {
    counter!(CHAT_MESSAGES_TOTAL).increment(1);
    histogram!(CHAT_DURATION_SECONDS).record(duration_secs);
}

/// Record a quota rejection.
#[inline]
pub fn record_quota_rejected() {
    counter!(QUOTA_REJECTED_TOTAL).increment(1);
}

/// Record a rate-limit rejection.
#[inline]
pub fn record_rate_limited() {
    counter!(RATE_LIMITED_TOTAL).increment(1);
}

/// Record one provider attempt.
#[inline]
pub fn record_provider_attempt(kind: &'static str, success: bool) {
    counter!(PROVIDER_ATTEMPTS_TOTAL, "provider" => kind, "outcome" => if success { "ok" } else { "err" })
        .increment(1);
}

/// Record a dispatch that exhausted all providers.
#[inline]
pub fn record_provider_exhausted() {
    counter!(PROVIDER_EXHAUSTED_TOTAL).increment(1);
}

/// Record affinity cache activity.
#[inline]
pub fn record_affinity(hit: bool) {
    if hit {
        counter!(AFFINITY_HITS_TOTAL).increment(1);
    } else {
        counter!(AFFINITY_MISSES_TOTAL).increment(1);
    }
}

/// Record current affinity cache population.
#[inline]
pub fn set_affinity_sessions(count: usize) {
    gauge!(AFFINITY_SESSIONS).set(count as f64);
}

/// Record a created subscription.
#[inline]
pub fn record_subscription_created(plan: &'static str) {
    counter!(SUBSCRIPTIONS_CREATED_TOTAL, "plan" => plan).increment(1);
}

/// Record expired subscriptions.
#[inline]
pub fn record_subscriptions_expired(count: u64) {
    counter!(SUBSCRIPTIONS_EXPIRED_TOTAL).increment(count);
}

/// Record a webhook delivery.
#[inline]
pub fn record_webhook(provider: &'static str, rejected: bool) {
    counter!(WEBHOOKS_TOTAL, "provider" => provider).increment(1);
    if rejected {
        counter!(WEBHOOKS_REJECTED_TOTAL, "provider" => provider).increment(1);
    }
}

/// Record an error by classification (see `parley_core::errors`).
#[inline]
pub fn record_error(error_type: &'static str) {
    counter!(ERRORS_TOTAL, "type" => error_type).increment(1);
}

//! Application state shared across request handlers.

use std::sync::Arc;

use parley_billing::{SubscriptionManager, WebhookVerifier};
use parley_dispatch::Dispatcher;
use parley_entitlement::QuotaTracker;
use parley_session::AffinityCache;
use parley_store::MemoryStore;

use crate::auth::TokenVerifier;
use crate::rate_limit::RateLimiter;
use crate::validate::RequestLimits;

/// Shared state for all request handlers.
///
/// Created once at process start; the affinity cache and rate limiter are
/// the only mutable in-process structures and are internally locked.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub sessions: Arc<AffinityCache>,
    pub dispatcher: Arc<Dispatcher>,
    pub subscriptions: Arc<SubscriptionManager<MemoryStore>>,
    pub quota: Arc<QuotaTracker<MemoryStore>>,
    /// `None` disables rate limiting.
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub webhooks: Arc<WebhookVerifier>,
    pub limits: RequestLimits,
    /// Shared secret gating internal endpoints; `None` disables them.
    pub internal_secret: Option<String>,
}

//! Router assembly, state construction, and the serve loop.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use parley_billing::{SubscriptionManager, WebhookSecrets, WebhookVerifier};
use parley_config::Config;
use parley_core::ProviderKind;
use parley_dispatch::{DeepSeekClient, Dispatcher, GeminiClient, ProviderClient, ProviderKey};
use parley_entitlement::QuotaTracker;
use parley_session::AffinityCache;
use parley_store::MemoryStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::TokenVerifier;
use crate::error::ServerError;
use crate::rate_limit::RateLimiter;
use crate::routes::{admin, chat, payment, status, subscription};
use crate::state::AppState;
use crate::validate::RequestLimits;

/// Assemble the application state from config and injected backends.
///
/// `clients` lets tests substitute scripted providers; production uses
/// [`default_clients`].
pub fn build_state(
    config: &Config,
    store: Arc<MemoryStore>,
    verifier: Arc<dyn TokenVerifier>,
    clients: Vec<Arc<dyn ProviderClient>>,
) -> AppState {
    let sessions = Arc::new(AffinityCache::new(
        Duration::from_secs(config.session.ttl_secs),
        config.session.max_entries,
    ));

    let mut keys = Vec::new();
    keys.extend(
        config
            .providers
            .gemini_keys
            .iter()
            .map(|k| ProviderKey::new(ProviderKind::Gemini, k.clone())),
    );
    keys.extend(
        config
            .providers
            .deepseek_keys
            .iter()
            .map(|k| ProviderKey::new(ProviderKind::Deepseek, k.clone())),
    );
    if keys.is_empty() {
        warn!("no provider API keys configured; chat dispatch will fail");
    }

    let dispatcher = Arc::new(Dispatcher::new(
        keys,
        clients,
        sessions.clone(),
        config.providers.max_retries,
        Duration::from_millis(config.providers.retry_delay_ms),
    ));

    let rate_limiter = config.server.rate_limit.as_ref().map(|rl| {
        Arc::new(RateLimiter::new(
            rl.max_requests,
            Duration::from_secs(rl.window_secs),
        ))
    });

    let webhooks = Arc::new(WebhookVerifier::new(
        WebhookSecrets {
            stripe: config.webhooks.stripe_secret.clone(),
            paypal: config.webhooks.paypal_secret.clone(),
            razorpay: config.webhooks.razorpay_secret.clone(),
        },
        config.webhooks.require_signatures,
    ));

    AppState {
        subscriptions: Arc::new(SubscriptionManager::new(store.clone())),
        quota: Arc::new(QuotaTracker::new(store.clone())),
        store,
        verifier,
        sessions,
        dispatcher,
        rate_limiter,
        webhooks,
        limits: RequestLimits {
            max_prompt_chars: config.server.max_prompt_chars,
            max_persona_chars: config.server.max_persona_chars,
            max_reply_chars: config.server.max_reply_chars,
        },
        internal_secret: config.server.internal_secret.clone(),
    }
}

/// The production provider clients.
pub fn default_clients(config: &Config) -> Vec<Arc<dyn ProviderClient>> {
    let timeout = Duration::from_secs(config.providers.timeout_secs);
    vec![
        Arc::new(GeminiClient::new(timeout)),
        Arc::new(DeepSeekClient::new(timeout)),
    ]
}

/// Build the HTTP router. Write endpoints are POST-gated; axum answers
/// other methods with 405.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat::handle_chat))
        .route("/user/status", get(status::handle_status))
        .route(
            "/subscription",
            get(subscription::handle_plans).post(subscription::handle_action),
        )
        .route("/subscription/activate", post(subscription::handle_activate))
        .route("/subscription/check-expiry", post(admin::handle_check_expiry))
        .route("/payment/confirm", post(payment::handle_confirm))
        .route("/payment/webhook", post(payment::handle_webhook))
        .route("/reset-daily", post(admin::handle_reset_daily))
        .route(
            "/session",
            get(admin::handle_session_stats).post(admin::handle_session_action),
        )
        .route("/health", get(admin::handle_health))
        .with_state(state)
}

/// Run the server until the cancellation token fires.
pub async fn run_with_shutdown(
    config: Config,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    // Background: rate limiter sweep.
    if let (Some(limiter), Some(rl)) = (&state.rate_limiter, &config.server.rate_limit) {
        let limiter = limiter.clone();
        let interval = Duration::from_secs(rl.cleanup_interval_secs);
        let token = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        let removed = limiter.sweep();
                        if removed > 0 {
                            debug!(removed, tracked = limiter.len(), "rate limit buckets swept");
                        }
                    }
                }
            }
        });
    }

    // Background: affinity cache sweep.
    if config.session.sweep_interval_secs > 0 {
        let sessions = state.sessions.clone();
        let interval = Duration::from_secs(config.session.sweep_interval_secs);
        let token = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        sessions.sweep();
                        parley_metrics::set_affinity_sessions(sessions.len());
                    }
                }
            }
        });
    }

    // Background: subscription expiry + stale counter sweep.
    if config.sweep.expiry_interval_secs > 0 {
        let subscriptions = state.subscriptions.clone();
        let quota = state.quota.clone();
        let interval = Duration::from_secs(config.sweep.expiry_interval_secs);
        let token = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        let now = parley_core::date::unix_now();
                        match subscriptions.expire_sweep(now).await {
                            Ok(expired) => {
                                parley_metrics::record_subscriptions_expired(expired.len() as u64);
                            }
                            Err(err) => warn!(error = %err, "expiry sweep failed"),
                        }
                        if let Err(err) = quota.reset_stale_counts(now).await {
                            warn!(error = %err, "stale counter sweep failed");
                        }
                    }
                }
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    info!(listen = %config.server.listen, "parley server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("server stopped");
    Ok(())
}

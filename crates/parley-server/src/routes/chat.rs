//! The chat endpoint — the per-request gatekeeper.
//!
//! Pipeline: authenticate → rate-limit → validate → resolve entitlement
//! (persisting any detected downgrade) → quota pre-check → dispatch →
//! consume quota. Quota is charged only after the provider call succeeded;
//! a failed dispatch leaves the counters untouched.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use parley_core::PersonaKind;
use parley_core::date::unix_now;
use parley_dispatch::sanitize_reply;
use parley_entitlement::{EntitlementError, resolve};
use parley_session::AffinityCache;
use parley_store::{SubscriptionStore, UserStore};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validate::validate_chat_input;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub prompt: String,
    pub persona: String,
    /// Persona category, gated by plan features.
    #[serde(default)]
    pub persona_kind: PersonaKind,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub success: bool,
    pub message: String,
    pub session_id: String,
}

pub async fn handle_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let started = Instant::now();
    parley_metrics::record_request("chat");

    // 1. Authenticate.
    let claims = authenticate(&state.verifier, &headers).await?;

    // 2. Rate limit by identity.
    if let Some(ref limiter) = state.rate_limiter {
        if !limiter.allow(&claims.uid) {
            parley_metrics::record_rate_limited();
            return Err(ApiError::RateLimited);
        }
    }

    // 3. Validate payload.
    validate_chat_input(&req.prompt, &req.persona, &state.limits)?;
    let session_id = req
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(AffinityCache::generate_session_id);

    let now = unix_now();

    // 4. Resolve entitlement; persist a detected downgrade before going on.
    let mut user = state
        .store
        .get_user(&claims.uid)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    let active = state.store.active_subscription(&claims.uid).await?;
    let resolution = resolve(&user, active.as_ref(), now);
    if let Some(ref intent) = resolution.downgrade {
        state
            .subscriptions
            .downgrade_expired(&intent.uid, &intent.subscription_id, now)
            .await?;
        parley_metrics::record_subscriptions_expired(1);
        user = state
            .store
            .get_user(&claims.uid)
            .await?
            .ok_or(ApiError::NotFound("User"))?;
    }
    let entitlement = resolution.entitlement;

    if !entitlement.features.allows_persona(req.persona_kind) {
        return Err(ApiError::PersonaForbidden);
    }

    // 5. Quota pre-check — nothing consumed yet.
    state
        .quota
        .check(&user, entitlement.daily_limit, now)
        .map_err(|err| {
            if matches!(err, EntitlementError::QuotaExceeded { .. }) {
                parley_metrics::record_quota_rejected();
            }
            ApiError::from(err)
        })?;

    // 6. Dispatch to a provider.
    let raw = state
        .dispatcher
        .dispatch(&req.prompt, &session_id)
        .await
        .map_err(|err| {
            parley_metrics::record_provider_exhausted();
            ApiError::from(err)
        })?;
    let message = sanitize_reply(&raw, state.limits.max_reply_chars);

    // 7. Charge quota against the successful response.
    state
        .quota
        .consume(&user, entitlement.daily_limit, now)
        .await?;

    parley_metrics::record_chat_message(started.elapsed().as_secs_f64());
    info!(uid = %claims.uid, persona = %req.persona, "chat request served");

    Ok(Json(ChatResponse {
        success: true,
        message,
        session_id,
    }))
}

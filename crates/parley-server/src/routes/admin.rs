//! Internal and operational endpoints: expiry sweep, daily reset,
//! session introspection, health.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use parley_core::date::unix_now;
use parley_session::AffinityCache;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the shared secret for internal endpoints.
const INTERNAL_SECRET_HEADER: &str = "x-internal-secret";

fn require_internal_secret(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let expected = state
        .internal_secret
        .as_deref()
        .ok_or(ApiError::Unauthorized)?;
    let provided = headers
        .get(INTERNAL_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    if provided == expected {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// POST `/subscription/check-expiry` — internal sweep trigger.
///
/// Expires lapsed subscriptions and zeroes stale daily counters.
pub async fn handle_check_expiry(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    parley_metrics::record_request("check_expiry");
    require_internal_secret(&state, &headers)?;

    let now = unix_now();
    let expired = state.subscriptions.expire_sweep(now).await?;
    parley_metrics::record_subscriptions_expired(expired.len() as u64);
    let reset = state.quota.reset_stale_counts(now).await?;

    info!(
        expired = expired.len(),
        reset = reset.len(),
        "expiry sweep completed"
    );
    Ok(Json(json!({
        "success": true,
        "expiredSubscriptions": expired,
        "expiredCount": expired.len(),
        "dailyCountsReset": reset.len(),
    })))
}

/// POST `/reset-daily` — caller resets their own daily counter.
pub async fn handle_reset_daily(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    parley_metrics::record_request("reset_daily");
    let claims = authenticate(&state.verifier, &headers).await?;

    state.quota.reset_daily(&claims.uid, unix_now()).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Daily message count reset.",
    })))
}

/// GET `/session` — affinity cache statistics.
pub async fn handle_session_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    parley_metrics::record_request("session");
    authenticate(&state.verifier, &headers).await?;

    let stats = state.sessions.manager_stats();
    parley_metrics::set_affinity_sessions(stats.total_sessions);
    Ok(Json(json!({
        "success": true,
        "data": {
            "activeSessions": stats.total_sessions,
            "stats": stats,
        },
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionActionRequest {
    pub action: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// POST `/session` — session cache administration.
pub async fn handle_session_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SessionActionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    parley_metrics::record_request("session");
    authenticate(&state.verifier, &headers).await?;

    match req.action.as_str() {
        "stats" => {
            let session_id = req
                .session_id
                .ok_or_else(|| ApiError::InvalidInput("Session ID required".to_string()))?;
            let stats = state
                .sessions
                .session_stats(&session_id)
                .ok_or(ApiError::NotFound("Session"))?;
            Ok(Json(json!({
                "success": true,
                "sessionId": session_id,
                "stats": stats,
            })))
        }
        "clear" => {
            let session_id = req
                .session_id
                .ok_or_else(|| ApiError::InvalidInput("Session ID required".to_string()))?;
            state.sessions.evict(&session_id);
            Ok(Json(json!({
                "success": true,
                "message": format!("Session {session_id} cleared"),
            })))
        }
        "cleanup" => {
            let removed = state.sessions.sweep();
            parley_metrics::set_affinity_sessions(state.sessions.len());
            Ok(Json(json!({
                "success": true,
                "message": format!("Cleaned up {removed} sessions"),
            })))
        }
        "generate" => Ok(Json(json!({
            "success": true,
            "sessionId": AffinityCache::generate_session_id(),
        }))),
        _ => Err(ApiError::InvalidInput("Invalid action".to_string())),
    }
}

/// GET `/health` — liveness probe.
pub async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": parley_core::VERSION,
        "users": state.store.user_count(),
    }))
}

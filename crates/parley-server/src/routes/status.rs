//! Entitlement snapshot endpoint.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use parley_core::date::unix_now;
use parley_entitlement::{quota_remaining, resolve};
use parley_store::{SubscriptionRecord, SubscriptionStore, UserRecord, UserStore};
use serde_json::json;
use tracing::info;

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::state::AppState;

/// GET `/user/status` — the resolved entitlement snapshot.
///
/// First sight of an identity creates its default free-tier user document.
/// A lapsed subscription found here is downgraded before the snapshot is
/// built, so the response never reports stale paid access.
pub async fn handle_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    parley_metrics::record_request("user_status");
    let claims = authenticate(&state.verifier, &headers).await?;
    let now = unix_now();

    let mut user = match state.store.get_user(&claims.uid).await? {
        Some(user) => user,
        None => {
            let user = UserRecord::new_free(claims.uid.clone(), claims.email.clone(), now);
            state.store.put_user(user.clone()).await?;
            info!(uid = %claims.uid, "default user document created");
            user
        }
    };

    let mut active = state.store.active_subscription(&claims.uid).await?;
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
        active = None;
    }
    let entitlement = resolution.entitlement;

    let remaining = quota_remaining(&user, entitlement.daily_limit, now);
    let unlimited = entitlement.has_unlimited_messages();

    Ok(Json(json!({
        "success": true,
        "user": {
            "uid": user.uid,
            "email": user.email,
            "displayName": user.display_name,
            "plan": entitlement.plan,
            "subscriptionStatus": user.subscription_status,
            "features": entitlement.features,
            "limits": {
                "dailyMessages": entitlement.daily_limit,
                "remainingMessages": remaining,
                "isLimitReached": !unlimited && remaining == 0,
                "hasUnlimitedMessages": unlimited,
            },
            "subscription": active.as_ref().map(subscription_view),
            "stats": {
                "messageCount": user.message_count,
                "dailyMessageCount": user.daily_message_count,
                "lastMessageDate": user.last_message_date,
            },
        },
    })))
}

fn subscription_view(sub: &SubscriptionRecord) -> serde_json::Value {
    json!({
        "id": sub.id,
        "plan": sub.plan,
        "status": sub.status,
        "startDate": sub.start_date,
        "endDate": sub.end_date,
        "autoRenew": sub.auto_renew,
        "paymentMethod": sub.payment_method,
        "amount": sub.amount,
        "currency": sub.currency,
    })
}

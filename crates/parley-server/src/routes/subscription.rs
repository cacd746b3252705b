//! Subscription endpoints: plan catalog, purchase actions, activation.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use parley_core::date::unix_now;
use parley_core::plan::{Currency, FeatureFlags, PaymentMethod, Plan, plan_price};
use parley_billing::CreateSubscription;
use serde::Deserialize;
use serde_json::json;

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::state::AppState;

/// GET `/subscription` — available plans.
pub async fn handle_plans(State(_state): State<AppState>) -> Json<serde_json::Value> {
    parley_metrics::record_request("subscription_plans");
    let plan_view = |plan: Plan, display: &str| {
        json!({
            "id": plan,
            "name": plan,
            "displayName": display,
            "priceUSD": plan_price(plan, Currency::Usd).unwrap_or(0.0),
            "priceINR": plan_price(plan, Currency::Inr).unwrap_or(0.0),
            "interval": "monthly",
            "features": FeatureFlags::for_plan(plan),
        })
    };
    Json(json!({
        "success": true,
        "plans": [
            plan_view(Plan::Free, "Free Plan"),
            plan_view(Plan::Pro, "Pro Plan"),
            plan_view(Plan::ProPlus, "Pro Plus Plan"),
        ],
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionActionRequest {
    pub action: String,
    #[serde(default)]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub immediately: Option<bool>,
}

/// POST `/subscription` — purchase/cancellation actions for the caller.
pub async fn handle_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubscriptionActionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    parley_metrics::record_request("subscription_action");
    let claims = authenticate(&state.verifier, &headers).await?;
    let now = unix_now();

    match req.action.as_str() {
        "send_instructions" => {
            let plan = req
                .plan
                .ok_or_else(|| ApiError::InvalidInput("Missing plan".to_string()))?;
            let pending = state
                .subscriptions
                .create_pending(&claims.uid, plan, now)
                .await?;
            // The activation token travels by email, never in the response.
            Ok(Json(json!({
                "success": true,
                "message": "Payment instructions sent.",
                "subscriptionId": pending.subscription_id,
            })))
        }
        "confirm_payment" => {
            let plan = req
                .plan
                .ok_or_else(|| ApiError::InvalidInput("Missing plan".to_string()))?;
            let currency = req.currency.unwrap_or_default();
            let amount = plan_price(plan, currency)
                .ok_or_else(|| ApiError::InvalidInput("Invalid subscription plan".to_string()))?;

            let outcome = state
                .subscriptions
                .create(
                    CreateSubscription {
                        uid: claims.uid.clone(),
                        email: claims.email.clone(),
                        display_name: claims.display_name.clone(),
                        plan,
                        amount,
                        currency,
                        payment_method: PaymentMethod::Manual,
                        transaction_id: None,
                    },
                    now,
                )
                .await?;
            parley_metrics::record_subscription_created(outcome.plan.as_str());

            Ok(Json(json!({
                "success": true,
                "message": "Payment confirmed and subscription updated.",
                "data": {
                    "subscriptionId": outcome.subscription_id,
                    "plan": outcome.plan,
                    "status": "active",
                    "startDate": outcome.start_date,
                    "endDate": outcome.end_date,
                    "features": outcome.features,
                },
            })))
        }
        "cancel" => {
            let subscription_id = req
                .subscription_id
                .ok_or_else(|| ApiError::InvalidInput("Missing subscriptionId".to_string()))?;
            state
                .subscriptions
                .cancel(
                    &claims.uid,
                    &subscription_id,
                    req.immediately.unwrap_or(false),
                    now,
                )
                .await?;
            Ok(Json(json!({
                "success": true,
                "message": "Subscription cancelled.",
            })))
        }
        _ => Err(ApiError::InvalidInput("Invalid action".to_string())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    pub subscription_id: String,
    pub activation_token: String,
}

/// POST `/subscription/activate` — redeem an emailed activation token.
pub async fn handle_activate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ActivateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    parley_metrics::record_request("subscription_activate");
    let claims = authenticate(&state.verifier, &headers).await?;

    state
        .subscriptions
        .activate(
            &claims.uid,
            &req.subscription_id,
            &req.activation_token,
            unix_now(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Subscription activated.",
    })))
}

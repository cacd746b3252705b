//! Payment confirmation and provider webhooks.

use std::str::FromStr;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use parley_billing::{CreateSubscription, WebhookProvider};
use parley_core::date::unix_now;
use parley_core::plan::{Currency, PaymentMethod, Plan, plan_from_amount};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Payment methods accepted on the confirm path (manual goes through
/// `/subscription` instead).
fn parse_payment_method(s: &str) -> Result<PaymentMethod, ApiError> {
    match s.to_ascii_lowercase().as_str() {
        "stripe" => Ok(PaymentMethod::Stripe),
        "paypal" => Ok(PaymentMethod::Paypal),
        "crypto" => Ok(PaymentMethod::Crypto),
        "razorpay" => Ok(PaymentMethod::Razorpay),
        _ => Err(ApiError::InvalidPaymentMethod),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmRequest {
    pub uid: String,
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub plan: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: Currency,
    pub payment_method: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// POST `/payment/confirm` — processor-confirmed payment.
///
/// Validates plan/method/amount, then records user + subscription +
/// payment + audit atomically. Replays of the same transaction id return
/// the original result.
pub async fn handle_confirm(
    State(state): State<AppState>,
    Json(req): Json<PaymentConfirmRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    parley_metrics::record_request("payment_confirm");

    let plan = Plan::from_str(&req.plan)
        .ok()
        .filter(Plan::is_paid)
        .ok_or_else(|| ApiError::InvalidInput("Invalid subscription plan".to_string()))?;
    let payment_method = parse_payment_method(&req.payment_method)?;

    let outcome = state
        .subscriptions
        .create(
            CreateSubscription {
                uid: req.uid.clone(),
                email: req.email,
                display_name: req.display_name,
                plan,
                amount: req.amount,
                currency: req.currency,
                payment_method,
                transaction_id: req.transaction_id,
            },
            unix_now(),
        )
        .await?;
    if !outcome.replayed {
        parley_metrics::record_subscription_created(outcome.plan.as_str());
    }

    info!(uid = %req.uid, plan = %outcome.plan, replayed = outcome.replayed, "payment confirmed");
    Ok(Json(json!({
        "success": true,
        "message": "Payment confirmed and subscription activated",
        "data": {
            "subscriptionId": outcome.subscription_id,
            "paymentId": outcome.payment_id,
            "plan": outcome.plan,
            "status": "active",
            "startDate": outcome.start_date,
            "endDate": outcome.end_date,
            "features": outcome.features,
        },
    })))
}

/// Webhook payload common shape across providers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload {
    uid: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    plan: Option<Plan>,
    amount: f64,
    #[serde(default)]
    currency: Currency,
    transaction_id: String,
}

fn detect_provider(headers: &HeaderMap) -> Option<(WebhookProvider, Option<String>)> {
    for (header, provider) in [
        ("stripe-signature", WebhookProvider::Stripe),
        ("x-razorpay-signature", WebhookProvider::Razorpay),
        ("paypal-transmission-sig", WebhookProvider::Paypal),
    ] {
        if let Some(value) = headers.get(header) {
            let signature = value.to_str().ok().map(str::to_string);
            return Some((provider, signature));
        }
    }
    None
}

fn provider_label(provider: WebhookProvider) -> &'static str {
    match provider {
        WebhookProvider::Stripe => "stripe",
        WebhookProvider::Paypal => "paypal",
        WebhookProvider::Razorpay => "razorpay",
    }
}

/// POST `/payment/webhook` — provider-pushed payment events.
///
/// The signature is verified over the raw body before the payload is even
/// parsed; a rejected delivery mutates nothing.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    parley_metrics::record_request("payment_webhook");

    let (provider, signature) = detect_provider(&headers)
        .ok_or_else(|| ApiError::InvalidInput("Unknown webhook provider".to_string()))?;
    let label = provider_label(provider);

    if let Err(err) = state
        .webhooks
        .verify(provider, &body, signature.as_deref())
    {
        warn!(provider = label, "webhook signature rejected");
        parley_metrics::record_webhook(label, true);
        return Err(err.into());
    }
    parley_metrics::record_webhook(label, false);

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|_| ApiError::InvalidInput("Invalid webhook payload".to_string()))?;

    let plan = payload
        .plan
        .unwrap_or_else(|| plan_from_amount(payload.amount, payload.currency));
    let payment_method = match provider {
        WebhookProvider::Stripe => PaymentMethod::Stripe,
        WebhookProvider::Paypal => PaymentMethod::Paypal,
        WebhookProvider::Razorpay => PaymentMethod::Razorpay,
    };

    let outcome = state
        .subscriptions
        .create(
            CreateSubscription {
                uid: payload.uid.clone(),
                email: payload.email,
                display_name: None,
                plan,
                amount: payload.amount,
                currency: payload.currency,
                payment_method,
                transaction_id: Some(payload.transaction_id),
            },
            unix_now(),
        )
        .await?;
    if !outcome.replayed {
        parley_metrics::record_subscription_created(outcome.plan.as_str());
    }

    info!(provider = label, uid = %payload.uid, "webhook processed");
    Ok(Json(json!({
        "success": true,
        "received": true,
        "subscriptionId": outcome.subscription_id,
    })))
}

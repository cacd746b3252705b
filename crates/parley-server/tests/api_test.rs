//! Integration tests for the parley HTTP surface.
//!
//! These tests run the real router over a loopback listener with the
//! in-memory store, a static token verifier, and scripted provider
//! clients; only the outbound provider HTTP calls are faked.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use parley_config::Config;
use parley_core::ProviderKind;
use parley_core::date::unix_now;
use parley_dispatch::{ProviderClient, ProviderError};
use parley_server::{StaticTokenVerifier, build_state, router};
use parley_store::{MemoryStore, PaymentStore, SubscriptionStore, UserRecord, UserStore};
use sha2::Sha256;

const STRIPE_SECRET: &str = "whsec_test";
const INTERNAL_SECRET: &str = "cron-secret";

// ============================================================================
// Scripted provider
// ============================================================================

struct ScriptedProvider {
    kind: ProviderKind,
    ok_keys: HashSet<String>,
}

impl ScriptedProvider {
    fn new(kind: ProviderKind, ok_keys: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            kind,
            ok_keys: ok_keys.iter().map(|s| s.to_string()).collect(),
        })
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, ProviderError> {
        if self.ok_keys.contains(api_key) {
            Ok(format!("echo: {prompt}"))
        } else {
            Err(ProviderError::Status(503))
        }
    }
}

// ============================================================================
// Test server harness
// ============================================================================

struct TestServer {
    base: String,
    store: Arc<MemoryStore>,
    client: reqwest::Client,
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.tokens = HashMap::from([
        ("tok-alice".to_string(), "alice".to_string()),
        ("tok-bob".to_string(), "bob".to_string()),
    ]);
    config.server.internal_secret = Some(INTERNAL_SECRET.to_string());
    config.providers.gemini_keys = vec!["mock-ok".to_string()];
    config.providers.retry_delay_ms = 0;
    config.webhooks.stripe_secret = Some(STRIPE_SECRET.to_string());
    config.webhooks.require_signatures = true;
    config
}

async fn spawn_server_with(config: Config, clients: Vec<Arc<dyn ProviderClient>>) -> TestServer {
    let store = Arc::new(MemoryStore::new());
    let verifier = Arc::new(StaticTokenVerifier::new(config.auth.tokens.clone()));
    let state = build_state(&config, store.clone(), verifier, clients);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{addr}"),
        store,
        client: reqwest::Client::new(),
    }
}

async fn spawn_server() -> TestServer {
    spawn_server_with(
        test_config(),
        vec![ScriptedProvider::new(ProviderKind::Gemini, &["mock-ok"])],
    )
    .await
}

impl TestServer {
    async fn seed_user(&self, uid: &str, daily: u32, last: Option<i64>) {
        let mut user = UserRecord::new_free(uid, None, unix_now() - 10_000);
        user.daily_message_count = daily;
        user.message_count = u64::from(daily);
        user.last_message_date = last;
        self.store.put_user(user).await.unwrap();
    }

    async fn chat(&self, token: Option<&str>, prompt: &str) -> reqwest::Response {
        let mut req = self
            .client
            .post(format!("{}/chat", self.base))
            .json(&serde_json::json!({ "prompt": prompt, "persona": "einstein" }));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }
}

fn stripe_signature(body: &str, secret: &str) -> String {
    let timestamp = "1700000000";
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn chat_requires_authentication() {
    let server = spawn_server().await;

    let resp = server.chat(None, "hello world").await;
    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);

    let resp = server.chat(Some("bad-token"), "hello world").await;
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn chat_serves_and_charges_quota() {
    let server = spawn_server().await;
    server.seed_user("alice", 0, None).await;

    let resp = server.chat(Some("tok-alice"), "tell me about lighthouses").await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "echo: tell me about lighthouses");
    assert!(body["sessionId"].as_str().unwrap().starts_with("session_"));

    let user = server.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.daily_message_count, 1);
    assert_eq!(user.message_count, 1);
    assert!(user.last_message_date.is_some());
}

#[tokio::test]
async fn chat_rejects_exhausted_quota() {
    let server = spawn_server().await;
    server.seed_user("alice", 20, Some(unix_now())).await;

    let resp = server.chat(Some("tok-alice"), "one more please").await;
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Daily message limit"));

    // Nothing consumed.
    let user = server.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.daily_message_count, 20);
}

#[tokio::test]
async fn chat_day_rollover_allows_and_resets() {
    let server = spawn_server().await;
    // Maxed out yesterday.
    server.seed_user("alice", 20, Some(unix_now() - 86_400)).await;

    let resp = server.chat(Some("tok-alice"), "good morning").await;
    assert_eq!(resp.status(), 200);

    let user = server.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.daily_message_count, 1);
    assert_eq!(user.message_count, 21);
}

#[tokio::test]
async fn chat_rejects_denylisted_prompt() {
    let server = spawn_server().await;
    server.seed_user("alice", 0, None).await;

    let resp = server.chat(Some("tok-alice"), "run sudo rm -rf please").await;
    assert_eq!(resp.status(), 400);

    // Invalid input never reaches quota.
    let user = server.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.daily_message_count, 0);
}

#[tokio::test]
async fn chat_provider_exhaustion_is_503_and_uncharged() {
    let server = spawn_server_with(
        test_config(),
        vec![ScriptedProvider::new(ProviderKind::Gemini, &[])],
    )
    .await;
    server.seed_user("alice", 3, Some(unix_now())).await;

    let resp = server.chat(Some("tok-alice"), "anyone home").await;
    assert_eq!(resp.status(), 503);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Service temporarily unavailable. Please try again."
    );

    // Failed dispatch must not consume quota.
    let user = server.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.daily_message_count, 3);
}

#[tokio::test]
async fn write_endpoints_are_method_gated() {
    let server = spawn_server().await;

    for path in ["/chat", "/payment/confirm", "/payment/webhook", "/reset-daily"] {
        let resp = server
            .client
            .get(format!("{}{}", server.base, path))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 405, "{path} should reject GET");
    }
}

#[tokio::test]
async fn user_status_creates_default_document() {
    let server = spawn_server().await;

    let resp = server
        .client
        .get(format!("{}/user/status", server.base))
        .bearer_auth("tok-alice")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();

    assert_eq!(body["user"]["plan"], "free");
    assert_eq!(body["user"]["limits"]["dailyMessages"], 20);
    assert_eq!(body["user"]["limits"]["remainingMessages"], 20);
    assert_eq!(body["user"]["limits"]["hasUnlimitedMessages"], false);
    assert_eq!(body["user"]["features"]["basicPersonas"], true);
    assert_eq!(body["user"]["features"]["premiumPersonas"], false);
    assert!(body["user"]["subscription"].is_null());

    assert!(server.store.get_user("alice").await.unwrap().is_some());
}

#[tokio::test]
async fn payment_confirm_then_unlimited_chat() {
    let server = spawn_server().await;
    server.seed_user("alice", 20, Some(unix_now())).await;

    // Over quota as a free user.
    assert_eq!(server.chat(Some("tok-alice"), "hello").await.status(), 403);

    let resp = server
        .client
        .post(format!("{}/payment/confirm", server.base))
        .json(&serde_json::json!({
            "uid": "alice",
            "email": "alice@example.com",
            "plan": "pro",
            "amount": 2.50,
            "currency": "USD",
            "paymentMethod": "stripe",
            "transactionId": "tx_test_1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["features"]["premiumPersonas"], true);
    assert_eq!(body["data"]["features"]["customPersonas"], false);

    // Now unlimited.
    assert_eq!(server.chat(Some("tok-alice"), "hello again").await.status(), 200);
}

#[tokio::test]
async fn payment_confirm_rejects_bad_amount_and_method() {
    let server = spawn_server().await;

    let resp = server
        .client
        .post(format!("{}/payment/confirm", server.base))
        .json(&serde_json::json!({
            "uid": "alice",
            "plan": "pro",
            "amount": 1.00,
            "paymentMethod": "stripe",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = server
        .client
        .post(format!("{}/payment/confirm", server.base))
        .json(&serde_json::json!({
            "uid": "alice",
            "plan": "pro",
            "amount": 2.50,
            "paymentMethod": "venmo",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid payment method");
}

#[tokio::test]
async fn webhook_with_bad_signature_mutates_nothing() {
    let server = spawn_server().await;
    let body = serde_json::json!({
        "uid": "bob",
        "amount": 2.50,
        "currency": "USD",
        "transactionId": "tx_evil",
    })
    .to_string();

    let resp = server
        .client
        .post(format!("{}/payment/webhook", server.base))
        .header("stripe-signature", "t=1,v1=deadbeef")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Rejected before any state mutation.
    assert!(server.store.get_user("bob").await.unwrap().is_none());
    assert!(server
        .store
        .payment_by_transaction("tx_evil")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn webhook_with_valid_signature_processes_payment() {
    let server = spawn_server().await;
    let body = serde_json::json!({
        "uid": "bob",
        "email": "bob@example.com",
        "plan": "pro",
        "amount": 2.50,
        "currency": "USD",
        "transactionId": "tx_hook_1",
    })
    .to_string();

    let resp = server
        .client
        .post(format!("{}/payment/webhook", server.base))
        .header("stripe-signature", stripe_signature(&body, STRIPE_SECRET))
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let user = server.store.get_user("bob").await.unwrap().unwrap();
    assert_eq!(user.plan, parley_core::Plan::Pro);
    assert!(server
        .store
        .payment_by_transaction("tx_hook_1")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn check_expiry_requires_shared_secret() {
    let server = spawn_server().await;

    let resp = server
        .client
        .post(format!("{}/subscription/check-expiry", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = server
        .client
        .post(format!("{}/subscription/check-expiry", server.base))
        .header("x-internal-secret", INTERNAL_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["expiredCount"], 0);
}

#[tokio::test]
async fn reset_daily_zeroes_own_counter() {
    let server = spawn_server().await;
    server.seed_user("alice", 17, Some(unix_now())).await;

    let resp = server
        .client
        .post(format!("{}/reset-daily", server.base))
        .bearer_auth("tok-alice")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let user = server.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.daily_message_count, 0);
}

#[tokio::test]
async fn session_admin_roundtrip() {
    let server = spawn_server().await;
    server.seed_user("alice", 0, None).await;

    // Create affinity via a chat call with an explicit session id.
    let resp = server
        .client
        .post(format!("{}/chat", server.base))
        .bearer_auth("tok-alice")
        .json(&serde_json::json!({
            "prompt": "hello there",
            "persona": "einstein",
            "sessionId": "session_test_1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = server
        .client
        .get(format!("{}/session", server.base))
        .bearer_auth("tok-alice")
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["activeSessions"], 1);
    assert_eq!(body["data"]["stats"]["geminiSessions"], 1);

    // Per-session stats.
    let resp = server
        .client
        .post(format!("{}/session", server.base))
        .bearer_auth("tok-alice")
        .json(&serde_json::json!({ "action": "stats", "sessionId": "session_test_1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Clear it.
    let resp = server
        .client
        .post(format!("{}/session", server.base))
        .bearer_auth("tok-alice")
        .json(&serde_json::json!({ "action": "clear", "sessionId": "session_test_1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = server
        .client
        .post(format!("{}/session", server.base))
        .bearer_auth("tok-alice")
        .json(&serde_json::json!({ "action": "stats", "sessionId": "session_test_1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Generate a fresh id.
    let resp = server
        .client
        .post(format!("{}/session", server.base))
        .bearer_auth("tok-alice")
        .json(&serde_json::json!({ "action": "generate" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["sessionId"].as_str().unwrap().starts_with("session_"));
}

#[tokio::test]
async fn subscription_confirm_payment_action() {
    let server = spawn_server().await;
    server.seed_user("alice", 0, None).await;

    let resp = server
        .client
        .post(format!("{}/subscription", server.base))
        .bearer_auth("tok-alice")
        .json(&serde_json::json!({ "action": "confirm_payment", "plan": "pro" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let user = server.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.plan, parley_core::Plan::Pro);
    assert_eq!(
        user.subscription_status,
        parley_core::SubscriptionStatus::Active
    );

    // Unknown action is a 400.
    let resp = server
        .client
        .post(format!("{}/subscription", server.base))
        .bearer_auth("tok-alice")
        .json(&serde_json::json!({ "action": "upgrade_me" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn pending_activation_flow_over_http() {
    let server = spawn_server().await;
    server.seed_user("alice", 0, None).await;

    let resp = server
        .client
        .post(format!("{}/subscription", server.base))
        .bearer_auth("tok-alice")
        .json(&serde_json::json!({ "action": "send_instructions", "plan": "pro" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let subscription_id = body["subscriptionId"].as_str().unwrap().to_string();
    // The token travels by email, never in the response.
    assert!(body.get("activationToken").is_none());

    // Pending grants nothing yet.
    let resp = server.chat(Some("tok-alice"), "am I premium yet").await;
    assert_eq!(resp.status(), 200); // free-tier limit still applies, not zero

    let token = server
        .store
        .get_subscription(&subscription_id)
        .await
        .unwrap()
        .unwrap()
        .activation_token
        .unwrap();

    // Wrong token is a 400.
    let resp = server
        .client
        .post(format!("{}/subscription/activate", server.base))
        .bearer_auth("tok-alice")
        .json(&serde_json::json!({
            "subscriptionId": subscription_id,
            "activationToken": "wrong",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Right token activates.
    let resp = server
        .client
        .post(format!("{}/subscription/activate", server.base))
        .bearer_auth("tok-alice")
        .json(&serde_json::json!({
            "subscriptionId": subscription_id,
            "activationToken": token,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let user = server.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(
        user.subscription_status,
        parley_core::SubscriptionStatus::Active
    );

    // Replaying the consumed token is terminal.
    let resp = server
        .client
        .post(format!("{}/subscription/activate", server.base))
        .bearer_auth("tok-alice")
        .json(&serde_json::json!({
            "subscriptionId": subscription_id,
            "activationToken": token,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let server = spawn_server().await;
    let resp = server
        .client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

//! DeepSeek provider client.

use std::time::Duration;

use async_trait::async_trait;
use parley_core::ProviderKind;
use reqwest::Client;
use serde_json::json;

use crate::error::ProviderError;
use crate::provider::ProviderClient;

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
const MODEL: &str = "deepseek-chat";

/// Client for the DeepSeek chat completions API (OpenAI-shaped).
#[derive(Debug, Clone)]
pub struct DeepSeekClient {
    client: Client,
    base_url: String,
}

impl DeepSeekClient {
    /// Create a client with the given per-attempt timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create with a custom reqwest [`Client`] and base URL (tests, proxies).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        Self {
            client,
            base_url: base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ProviderClient for DeepSeekClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Deepseek
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": MODEL,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": 150,
            "temperature": 0.9,
            "top_p": 0.95,
            "stream": false,
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let data: serde_json::Value = resp.json().await?;
        if let Some(text) = data
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
        {
            return Ok(text.to_string());
        }
        if let Some(message) = data.pointer("/error/message").and_then(|v| v.as_str()) {
            return Err(ProviderError::Upstream(message.to_string()));
        }
        Err(ProviderError::BadResponse)
    }
}

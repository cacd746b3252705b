//! Gemini provider client.

use std::time::Duration;

use async_trait::async_trait;
use parley_core::ProviderKind;
use reqwest::Client;
use serde_json::json;
use tracing::trace;

use crate::error::ProviderError;
use crate::provider::ProviderClient;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const MODEL: &str = "gemini-1.5-flash";

/// Client for the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
}

impl GeminiClient {
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
impl ProviderClient for GeminiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{MODEL}:generateContent?key={api_key}",
            self.base_url
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.9,
                "maxOutputTokens": 150,
                "topK": 40,
                "topP": 0.95,
                "candidateCount": 1,
            },
            "safetySettings": [
                { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
            ],
        });

        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let data: serde_json::Value = resp.json().await?;
        trace!(target: "parley_dispatch::gemini", "gemini response received");

        if let Some(text) = data
            .pointer("/candidates/0/content/parts/0/text")
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

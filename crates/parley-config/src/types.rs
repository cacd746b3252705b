//! Configuration type definitions for server, auth, providers, sessions,
//! webhooks, metrics, and logging.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub session: SessionCacheConfig,
    #[serde(default)]
    pub webhooks: WebhookConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_http_listen")]
    pub listen: String,
    /// Shared secret required by internal endpoints (`/subscription/check-expiry`).
    /// Unset disables those endpoints.
    #[serde(default)]
    pub internal_secret: Option<String>,
    /// Maximum prompt length in characters.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    /// Maximum persona name length in characters.
    #[serde(default = "default_max_persona_chars")]
    pub max_persona_chars: usize,
    /// Maximum characters of a provider reply returned to clients.
    #[serde(default = "default_max_reply_chars")]
    pub max_reply_chars: usize,
    /// Per-identity rate limiting. `None` disables it.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            internal_secret: None,
            max_prompt_chars: default_max_prompt_chars(),
            max_persona_chars: default_max_persona_chars(),
            max_reply_chars: default_max_reply_chars(),
            rate_limit: Some(RateLimitConfig::default()),
        }
    }
}

/// Fixed-window rate limiting per authenticated identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per identity within the time window.
    #[serde(default = "default_rate_limit_max_requests")]
    pub max_requests: u32,
    /// Window length in seconds.
    #[serde(default = "default_rate_limit_window_secs")]
    pub window_secs: u64,
    /// Cleanup interval in seconds for expired counters.
    #[serde(default = "default_rate_limit_cleanup_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_rate_limit_max_requests(),
            window_secs: default_rate_limit_window_secs(),
            cleanup_interval_secs: default_rate_limit_cleanup_secs(),
        }
    }
}

/// Bearer-token verification.
///
/// The static token map is the development/test backend; production
/// deployments verify tokens against the external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Static map of bearer token → user id.
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

/// Upstream provider key pools and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini_keys: Vec<String>,
    #[serde(default)]
    pub deepseek_keys: Vec<String>,
    /// Maximum attempts per discovery pass.
    #[serde(default = "default_dispatch_max_retries")]
    pub max_retries: usize,
    /// Delay between consecutive attempts in milliseconds.
    #[serde(default = "default_dispatch_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Per-attempt HTTP timeout in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            gemini_keys: Vec::new(),
            deepseek_keys: Vec::new(),
            max_retries: default_dispatch_max_retries(),
            retry_delay_ms: default_dispatch_retry_delay_ms(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

/// Session affinity cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCacheConfig {
    /// Idle TTL in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    /// Hard cap on cached sessions.
    #[serde(default = "default_session_max_entries")]
    pub max_entries: usize,
    /// Background sweep interval in seconds (0 disables the task).
    #[serde(default = "default_session_sweep_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            max_entries: default_session_max_entries(),
            sweep_interval_secs: default_session_sweep_secs(),
        }
    }
}

/// Payment-provider webhook verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Enforce signature verification (disable only outside production).
    #[serde(default = "default_true")]
    pub require_signatures: bool,
    #[serde(default)]
    pub stripe_secret: Option<String>,
    #[serde(default)]
    pub paypal_secret: Option<String>,
    #[serde(default)]
    pub razorpay_secret: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            require_signatures: true,
            stripe_secret: None,
            paypal_secret: None,
            razorpay_secret: None,
        }
    }
}

/// Periodic background sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Subscription expiry sweep interval in seconds (0 disables the task;
    /// the lazy per-request downgrade still applies).
    #[serde(default = "default_expiry_sweep_secs")]
    pub expiry_interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            expiry_interval_secs: default_expiry_sweep_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    /// Prometheus exporter listen address. `None` disables metrics export.
    pub listen: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Base log level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Output format (json, pretty, compact). Default: pretty.
    pub format: Option<String>,
    /// Output target (stdout, stderr). Default: stderr.
    pub output: Option<String>,
    /// Per-module log level overrides.
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

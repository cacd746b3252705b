//! CLI override flags applied on top of the config file.

use clap::Parser;

use crate::types::{Config, RateLimitConfig};

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override HTTP listen address, e.g. 0.0.0.0:8080
    #[arg(long)]
    pub listen: Option<String>,
    /// Override internal shared secret for sweep endpoints
    #[arg(long)]
    pub internal_secret: Option<String>,
    /// Override Gemini API keys (repeatable or comma-separated)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub gemini_key: Option<Vec<String>>,
    /// Override DeepSeek API keys (repeatable or comma-separated)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub deepseek_key: Option<Vec<String>>,
    /// Override maximum provider attempts per request
    #[arg(long)]
    pub max_retries: Option<usize>,
    /// Override session affinity TTL (seconds)
    #[arg(long)]
    pub session_ttl_secs: Option<u64>,
    /// Enable rate limiting with max requests per identity (0 = disabled)
    #[arg(long)]
    pub rate_limit_max_requests: Option<u32>,
    /// Rate limit time window in seconds
    #[arg(long)]
    pub rate_limit_window_secs: Option<u64>,
    /// Disable webhook signature verification (non-production only)
    #[arg(long)]
    pub allow_unsigned_webhooks: bool,
    /// Override metrics listen address
    #[arg(long)]
    pub metrics_listen: Option<String>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.listen {
        config.server.listen = v.clone();
    }
    if let Some(v) = &overrides.internal_secret {
        config.server.internal_secret = Some(v.clone());
    }
    if let Some(v) = &overrides.gemini_key {
        config.providers.gemini_keys = v.clone();
    }
    if let Some(v) = &overrides.deepseek_key {
        config.providers.deepseek_keys = v.clone();
    }
    if let Some(v) = overrides.max_retries {
        config.providers.max_retries = v;
    }
    if let Some(v) = overrides.session_ttl_secs {
        config.session.ttl_secs = v;
    }
    // Rate limiting: 0 disables, > 0 enables with that limit
    if let Some(max) = overrides.rate_limit_max_requests {
        if max == 0 {
            config.server.rate_limit = None;
        } else {
            let rl = config
                .server
                .rate_limit
                .get_or_insert_with(RateLimitConfig::default);
            rl.max_requests = max;
        }
    }
    if let Some(window) = overrides.rate_limit_window_secs {
        if let Some(ref mut rl) = config.server.rate_limit {
            rl.window_secs = window;
        }
    }
    if overrides.allow_unsigned_webhooks {
        config.webhooks.require_signatures = false;
    }
    if let Some(v) = &overrides.metrics_listen {
        config.metrics.listen = Some(v.clone());
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
}

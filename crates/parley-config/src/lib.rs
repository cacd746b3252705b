//! Configuration loading and CLI definitions for parley.

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, ConfigFormat, load_config, parse_config};
pub use types::{
    AuthConfig, Config, LoggingConfig, MetricsConfig, ProvidersConfig, RateLimitConfig,
    ServerConfig, SessionCacheConfig, SweepConfig, WebhookConfig,
};
pub use validate::validate_config;

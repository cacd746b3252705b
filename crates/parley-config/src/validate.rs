//! Configuration validation logic.

use crate::Config;
use crate::loader::ConfigError;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.listen.trim().is_empty() {
        return Err(ConfigError::Validation("server.listen is empty".into()));
    }
    if config.server.max_prompt_chars == 0 {
        return Err(ConfigError::Validation(
            "server.max_prompt_chars must be > 0".into(),
        ));
    }
    if config.server.max_persona_chars == 0 {
        return Err(ConfigError::Validation(
            "server.max_persona_chars must be > 0".into(),
        ));
    }
    if config.server.max_reply_chars == 0 {
        return Err(ConfigError::Validation(
            "server.max_reply_chars must be > 0".into(),
        ));
    }
    if let Some(ref rl) = config.server.rate_limit {
        if rl.max_requests == 0 {
            return Err(ConfigError::Validation(
                "rate_limit.max_requests must be > 0".into(),
            ));
        }
        if rl.window_secs == 0 {
            return Err(ConfigError::Validation(
                "rate_limit.window_secs must be > 0".into(),
            ));
        }
    }
    if config.providers.max_retries == 0 {
        return Err(ConfigError::Validation(
            "providers.max_retries must be > 0".into(),
        ));
    }
    if config.providers.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "providers.timeout_secs must be > 0".into(),
        ));
    }
    if config.session.ttl_secs == 0 {
        return Err(ConfigError::Validation("session.ttl_secs must be > 0".into()));
    }
    if config.session.max_entries == 0 {
        return Err(ConfigError::Validation(
            "session.max_entries must be > 0".into(),
        ));
    }
    if let Some(ref secret) = config.server.internal_secret {
        if secret.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.internal_secret must not be blank (omit it to disable internal endpoints)"
                    .into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn zero_retries_rejected() {
        let mut config = Config::default();
        config.providers.max_retries = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn blank_internal_secret_rejected() {
        let mut config = Config::default();
        config.server.internal_secret = Some("  ".into());
        assert!(validate_config(&config).is_err());

        config.server.internal_secret = Some("cron-secret".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_session_ttl_rejected() {
        let mut config = Config::default();
        config.session.ttl_secs = 0;
        assert!(validate_config(&config).is_err());
    }
}

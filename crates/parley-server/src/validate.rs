//! Inbound payload validation.
//!
//! Length bounds plus a deny-list of suspicious substrings. Defense in
//! depth against prompt smuggling into downstream HTML contexts, not a
//! complete sanitizer.

use crate::error::ApiError;

/// Substrings rejected anywhere in a prompt (case-insensitive).
const DENY_LIST: &[&str] = &[
    "system", "admin", "root", "sudo", "exec", "eval", "script", "javascript", "onerror", "onload",
    "onclick",
];

/// Request size limits, taken from config.
#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    pub max_prompt_chars: usize,
    pub max_persona_chars: usize,
    pub max_reply_chars: usize,
}

/// Validate a chat payload.
pub fn validate_chat_input(
    prompt: &str,
    persona: &str,
    limits: &RequestLimits,
) -> Result<(), ApiError> {
    if prompt.trim().is_empty() {
        return Err(ApiError::InvalidInput("Invalid prompt".to_string()));
    }
    if persona.trim().is_empty() {
        return Err(ApiError::InvalidInput("Invalid persona".to_string()));
    }
    if prompt.chars().count() > limits.max_prompt_chars {
        return Err(ApiError::InvalidInput("Prompt too long".to_string()));
    }
    if persona.chars().count() > limits.max_persona_chars {
        return Err(ApiError::InvalidInput("Invalid persona name".to_string()));
    }

    let lowered = prompt.to_lowercase();
    if DENY_LIST.iter().any(|pattern| lowered.contains(pattern)) {
        return Err(ApiError::InvalidInput(
            "Invalid content detected".to_string(),
        ));
    }
    Ok(())
}

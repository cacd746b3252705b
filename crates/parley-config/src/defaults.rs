//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `parley_core::defaults`.

use parley_core::defaults;

/// Generate default value functions that forward to parley_core::defaults constants.
macro_rules! default_fns {
    // For Copy types (integers, bool, etc.)
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_max_prompt_chars        => DEFAULT_MAX_PROMPT_CHARS: usize,
    default_max_persona_chars       => DEFAULT_MAX_PERSONA_CHARS: usize,
    default_max_reply_chars         => DEFAULT_MAX_REPLY_CHARS: usize,
    default_rate_limit_max_requests => DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32,
    default_rate_limit_window_secs  => DEFAULT_RATE_LIMIT_WINDOW_SECS: u64,
    default_rate_limit_cleanup_secs => DEFAULT_RATE_LIMIT_CLEANUP_SECS: u64,
    default_session_ttl_secs        => DEFAULT_SESSION_TTL_SECS: u64,
    default_session_max_entries     => DEFAULT_SESSION_MAX_ENTRIES: usize,
    default_session_sweep_secs      => DEFAULT_SESSION_SWEEP_SECS: u64,
    default_dispatch_max_retries    => DEFAULT_DISPATCH_MAX_RETRIES: usize,
    default_dispatch_retry_delay_ms => DEFAULT_DISPATCH_RETRY_DELAY_MS: u64,
    default_provider_timeout_secs   => DEFAULT_PROVIDER_TIMEOUT_SECS: u64,
    default_expiry_sweep_secs       => DEFAULT_EXPIRY_SWEEP_SECS: u64,
}

default_string_fns! {
    default_http_listen => DEFAULT_HTTP_LISTEN,
}

pub(crate) fn default_true() -> bool {
    true
}

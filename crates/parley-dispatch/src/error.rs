//! Dispatch error types.

/// Error from a single provider attempt. Internal — never surfaced to the
/// caller, only logged and counted.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("http: {0}")]
    Http(String),

    /// Non-success HTTP status from the provider.
    #[error("HTTP {0}")]
    Status(u16),

    /// Response body did not match the expected shape.
    #[error("invalid response format")]
    BadResponse,

    /// The provider returned an explicit error payload.
    #[error("upstream: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Http(err.to_string())
    }
}

/// Error surfaced by [`Dispatcher::dispatch`](crate::Dispatcher::dispatch).
///
/// Deliberately uniform: which provider/key failed, and why, stays
/// server-side.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no providers configured")]
    NoProviders,

    #[error("all providers are temporarily unavailable")]
    ProvidersUnavailable,
}

//! Bearer-token authentication.
//!
//! The identity provider is external; the server only needs "token →
//! identity" resolution behind a trait. [`StaticTokenVerifier`] is the
//! config-driven backend used in development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::error::ApiError;

/// Identity resolved from a verified token.
#[derive(Debug, Clone)]
pub struct AuthClaims {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Trait for token verification backends.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a bearer token and resolve the caller's identity.
    async fn verify(&self, token: &str) -> Result<AuthClaims, ApiError>;
}

/// Static token map backend (config-driven).
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthClaims, ApiError> {
        match self.tokens.get(token) {
            Some(uid) => Ok(AuthClaims {
                uid: uid.clone(),
                email: None,
                display_name: None,
            }),
            None => Err(ApiError::InvalidCredential),
        }
    }
}

/// A wrapper that allows hot-swapping the underlying token verifier.
///
/// Used for config reload without restarting the server. Uses
/// `parking_lot::RwLock` which doesn't poison on panic.
pub struct ReloadableVerifier {
    inner: parking_lot::RwLock<Arc<dyn TokenVerifier>>,
}

impl ReloadableVerifier {
    pub fn new<V: TokenVerifier + 'static>(verifier: V) -> Self {
        Self {
            inner: parking_lot::RwLock::new(Arc::new(verifier)),
        }
    }

    /// Replace the verifier. In-flight requests complete with the old
    /// backend; new requests use the new one.
    pub fn reload<V: TokenVerifier + 'static>(&self, verifier: V) {
        *self.inner.write() = Arc::new(verifier);
    }

    /// Clone of the current backend Arc (avoids holding the lock).
    #[inline]
    pub fn get(&self) -> Arc<dyn TokenVerifier> {
        self.inner.read().clone()
    }
}

impl std::fmt::Debug for ReloadableVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadableVerifier").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenVerifier for ReloadableVerifier {
    async fn verify(&self, token: &str) -> Result<AuthClaims, ApiError> {
        // Clone the Arc so we don't hold the lock across await
        let backend = self.get();
        backend.verify(token).await
    }
}

/// Extract the bearer token from request headers.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;
    value
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthenticated)
}

/// Authenticate a request: extract and verify the bearer token.
pub async fn authenticate(
    verifier: &Arc<dyn TokenVerifier>,
    headers: &HeaderMap,
) -> Result<AuthClaims, ApiError> {
    let token = bearer_token(headers)?;
    verifier.verify(token).await
}

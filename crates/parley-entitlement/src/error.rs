//! Entitlement error types.

use parley_store::StoreError;

/// Entitlement/quota error.
#[derive(Debug, thiserror::Error)]
pub enum EntitlementError {
    /// The daily message allowance is exhausted.
    #[error("daily message limit ({limit}) reached")]
    QuotaExceeded { limit: i32 },

    /// The requested persona category is not covered by the user's plan.
    #[error("persona requires an upgraded plan")]
    PersonaForbidden,

    /// Store failure.
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

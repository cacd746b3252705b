//! Server error types and HTTP mapping.
//!
//! Component errors converge here. Everything a client sees is a
//! `{success:false, error:<message>}` body with an appropriate status;
//! internal detail (store failures, provider identities) stays in the logs.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_billing::BillingError;
use parley_core::errors as error_types;
use parley_dispatch::DispatchError;
use parley_entitlement::EntitlementError;
use parley_store::StoreError;
use tracing::error;

/// Fatal server startup/runtime error.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config: {0}")]
    Config(String),
}

/// Request-level error returned to clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Invalid token")]
    InvalidCredential,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Daily message limit ({0}) reached. Upgrade to Pro for unlimited messages.")]
    QuotaExceeded(i32),
    #[error("This persona requires an upgraded plan")]
    PersonaForbidden,
    #[error("Service temporarily unavailable. Please try again.")]
    ServiceUnavailable,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Payment amount does not match plan price")]
    InvalidAmount,
    #[error("Invalid payment method")]
    InvalidPaymentMethod,
    #[error("Invalid activation token")]
    InvalidActivationToken,
    #[error("Subscription already activated or expired")]
    AlreadyActivated,
    #[error("Invalid webhook signature")]
    SignatureInvalid,
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredential => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidInput(_)
            | ApiError::InvalidAmount
            | ApiError::InvalidPaymentMethod
            | ApiError::InvalidActivationToken => StatusCode::BAD_REQUEST,
            ApiError::QuotaExceeded(_) | ApiError::PersonaForbidden | ApiError::Unauthorized => {
                StatusCode::FORBIDDEN
            }
            ApiError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyActivated => StatusCode::CONFLICT,
            ApiError::SignatureInvalid => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error classification for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredential => error_types::ERROR_AUTH,
            ApiError::RateLimited => error_types::ERROR_RATE_LIMIT,
            ApiError::InvalidInput(_) => error_types::ERROR_INPUT,
            ApiError::QuotaExceeded(_) => error_types::ERROR_QUOTA,
            ApiError::PersonaForbidden | ApiError::Unauthorized => error_types::ERROR_AUTH,
            ApiError::ServiceUnavailable => error_types::ERROR_PROVIDERS,
            ApiError::NotFound(_) => error_types::ERROR_INPUT,
            ApiError::InvalidAmount
            | ApiError::InvalidPaymentMethod
            | ApiError::InvalidActivationToken
            | ApiError::AlreadyActivated => error_types::ERROR_BILLING,
            ApiError::SignatureInvalid => error_types::ERROR_SIGNATURE,
            ApiError::Internal => error_types::ERROR_INTERNAL,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        parley_metrics::record_error(self.error_type());
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "store error");
        ApiError::Internal
    }
}

impl From<EntitlementError> for ApiError {
    fn from(err: EntitlementError) -> Self {
        match err {
            EntitlementError::QuotaExceeded { limit } => ApiError::QuotaExceeded(limit),
            EntitlementError::PersonaForbidden => ApiError::PersonaForbidden,
            EntitlementError::Store(e) => e.into(),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::InvalidAmount { .. } => ApiError::InvalidAmount,
            BillingError::InvalidPaymentMethod(_) => ApiError::InvalidPaymentMethod,
            BillingError::InvalidPlan => {
                ApiError::InvalidInput("Invalid subscription plan".to_string())
            }
            BillingError::NotFound => ApiError::NotFound("Subscription"),
            BillingError::Unauthorized => ApiError::Unauthorized,
            BillingError::InvalidToken => ApiError::InvalidActivationToken,
            BillingError::AlreadyActivated => ApiError::AlreadyActivated,
            BillingError::SignatureInvalid => ApiError::SignatureInvalid,
            BillingError::Store(e) => e.into(),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        // Both variants collapse into the same client-facing message; which
        // providers exist or failed is not the caller's business.
        match err {
            DispatchError::NoProviders | DispatchError::ProvidersUnavailable => {
                ApiError::ServiceUnavailable
            }
        }
    }
}

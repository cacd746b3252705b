//! Parley HTTP server.
//!
//! This module exposes the server implementation for use by integration
//! tests and potential embedding scenarios.

mod auth;
pub mod cli;
mod error;
mod rate_limit;
mod routes;
mod server;
mod state;
mod validate;

pub use auth::{AuthClaims, ReloadableVerifier, StaticTokenVerifier, TokenVerifier};
pub use cli::ServerArgs;
pub use error::{ApiError, ServerError};
pub use rate_limit::RateLimiter;
pub use server::{build_state, router, run_with_shutdown};
pub use state::AppState;
pub use tokio_util::sync::CancellationToken;

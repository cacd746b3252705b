//! # parley
//!
//! Backend for an AI persona chat service.
//!
//! This crate ties together the workspace members behind one facade,
//! suitable for embedding or for the unified CLI binary.
//!
//! ## Crates
//!
//! - [`parley_core`] - Domain types, pricing/feature tables, defaults
//! - [`parley_store`] - Document-store traits and the in-memory backend
//! - [`parley_entitlement`] - Entitlement resolution and daily quotas
//! - [`parley_billing`] - Subscription lifecycle and webhook verification
//! - [`parley_session`] - Session-to-provider affinity cache
//! - [`parley_dispatch`] - Provider clients and fallback dispatch
//! - [`parley_config`] - Configuration loading and validation
//! - [`parley_metrics`] - Prometheus-compatible metrics
//! - [`parley_server`] - HTTP surface and request gatekeeper

pub use parley_billing as billing;
pub use parley_config as config;
pub use parley_core as core;
pub use parley_dispatch as dispatch;
pub use parley_entitlement as entitlement;
pub use parley_metrics as metrics;
pub use parley_server as server;
pub use parley_session as session;
pub use parley_store as store;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use parley_config::{Config, load_config, validate_config};
    pub use parley_core::{FeatureFlags, Plan, SubscriptionStatus};
    pub use parley_server::{AppState, CancellationToken, build_state, router, run_with_shutdown};
    pub use parley_store::{MemoryStore, Store};
}

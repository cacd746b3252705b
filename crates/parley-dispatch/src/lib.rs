//! Provider discovery and fallback dispatch.
//!
//! Holds a pool of API keys across upstream inference providers. Each
//! request first tries the session's cached working key (via the affinity
//! cache); on miss or failure it shuffles the full candidate pool and walks
//! it until one key succeeds or the attempt budget is exhausted. Randomized
//! ordering spreads load across equivalent keys; it is a policy choice,
//! not a correctness requirement.
//!
//! Per-key failures are logged and swallowed; callers only ever see a
//! uniform "providers unavailable" error.

mod deepseek;
mod dispatcher;
mod error;
mod gemini;
mod provider;

pub use deepseek::DeepSeekClient;
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, ProviderError};
pub use gemini::GeminiClient;
pub use provider::{ProviderClient, ProviderKey, sanitize_reply};

//! Session-aware dispatch with randomized fallback.

use std::sync::Arc;
use std::time::Duration;

use parley_core::ProviderKind;
use parley_session::AffinityCache;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::error::{DispatchError, ProviderError};
use crate::provider::{ProviderClient, ProviderKey};

/// Routes prompts to upstream providers, consulting and maintaining the
/// session affinity cache.
pub struct Dispatcher {
    keys: Vec<ProviderKey>,
    clients: Vec<Arc<dyn ProviderClient>>,
    cache: Arc<AffinityCache>,
    max_retries: usize,
    retry_delay: Duration,
}

impl Dispatcher {
    pub fn new(
        keys: Vec<ProviderKey>,
        clients: Vec<Arc<dyn ProviderClient>>,
        cache: Arc<AffinityCache>,
        max_retries: usize,
        retry_delay: Duration,
    ) -> Self {
        Self {
            keys,
            clients,
            cache,
            max_retries,
            retry_delay,
        }
    }

    /// Number of configured keys across all providers.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    fn client_for(&self, kind: ProviderKind) -> Option<&Arc<dyn ProviderClient>> {
        self.clients.iter().find(|c| c.kind() == kind)
    }

    /// Run one completion for a session.
    ///
    /// Tries the session's cached working key first; on failure the entry
    /// is evicted and discovery takes over. The cache `get` refreshes the
    /// entry's idle clock as a side effect of the hit.
    pub async fn dispatch(
        &self,
        prompt: &str,
        session_id: &str,
    ) -> Result<String, DispatchError> {
        let cached = self.cache.get(session_id);
        parley_metrics::record_affinity(cached.is_some());
        if let Some(entry) = cached {
            debug!(session = session_id, provider = %entry.kind, "using cached provider key");
            match self.attempt(entry.kind, &entry.provider_key, prompt).await {
                Ok(message) => return Ok(message),
                Err(err) => {
                    debug!(
                        session = session_id,
                        provider = %entry.kind,
                        error = %err,
                        "cached provider key failed, falling back to discovery"
                    );
                    self.cache.record_error(session_id, &err.to_string());
                    self.cache.evict(session_id);
                }
            }
        }

        self.discover(prompt, session_id).await
    }

    async fn attempt(
        &self,
        kind: ProviderKind,
        api_key: &str,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let client = self
            .client_for(kind)
            .ok_or(ProviderError::BadResponse)?;
        let result = client.complete(api_key, prompt).await;
        parley_metrics::record_provider_attempt(kind.as_str(), result.is_ok());
        result
    }

    /// Walk a shuffled candidate list until one key works.
    async fn discover(&self, prompt: &str, session_id: &str) -> Result<String, DispatchError> {
        if self.keys.is_empty() {
            warn!("dispatch requested but no provider keys configured");
            return Err(DispatchError::NoProviders);
        }

        let mut candidates = self.keys.clone();
        candidates.shuffle(&mut rand::thread_rng());
        let budget = self.max_retries.min(candidates.len());

        for (attempt, candidate) in candidates.iter().take(budget).enumerate() {
            // Pace between attempts, never before the first.
            if attempt > 0 && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.attempt(candidate.kind, &candidate.key, prompt).await {
                Ok(message) => {
                    self.cache.put(session_id, &candidate.key, candidate.kind);
                    info!(
                        session = session_id,
                        provider = %candidate.kind,
                        attempt = attempt + 1,
                        "working provider discovered"
                    );
                    return Ok(message);
                }
                Err(err) => {
                    // Key identity stays out of the log line.
                    debug!(
                        session = session_id,
                        provider = %candidate.kind,
                        attempt = attempt + 1,
                        budget,
                        error = %err,
                        "provider attempt failed"
                    );
                }
            }
        }

        warn!(session = session_id, budget, "all provider attempts exhausted");
        Err(DispatchError::ProvidersUnavailable)
    }
}

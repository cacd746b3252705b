//! Session-to-provider affinity cache.
//!
//! Remembers, per chat session, the last upstream provider key that worked,
//! so subsequent requests skip provider discovery. This cache is an
//! optimization only: a miss always falls through to full discovery, so it
//! may be lost on restart with no correctness impact.
//!
//! Entries expire after a fixed idle TTL (lazily on read, and via
//! [`AffinityCache::sweep`]); total population is capped with
//! oldest-by-idle-time eviction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use parley_core::ProviderKind;
use serde::Serialize;
use tracing::debug;

/// One session's provider affinity.
#[derive(Debug, Clone)]
pub struct AffinityEntry {
    pub session_id: String,
    /// The API key that worked for this session.
    pub provider_key: String,
    pub kind: ProviderKind,
    pub created_at: Instant,
    pub last_used: Instant,
    /// Times a working key was (re)stored for this session.
    pub request_count: u64,
    /// Most recent provider error seen on this session, if any.
    pub last_error: Option<String>,
}

/// Point-in-time statistics for one session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub request_count: u64,
    pub provider: ProviderKind,
    pub age_secs: u64,
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerStats {
    pub total_sessions: usize,
    pub gemini_sessions: usize,
    pub deepseek_sessions: usize,
    pub average_age_secs: f64,
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
}

/// In-memory, time-boxed affinity cache.
///
/// Thread-safe; share via `Arc`.
#[derive(Debug)]
pub struct AffinityCache {
    entries: RwLock<HashMap<String, AffinityEntry>>,
    /// Idle TTL; entries unused longer than this are dead.
    ttl: Duration,
    /// Hard cap on population.
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AffinityCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Generate a fresh opaque session identifier.
    pub fn generate_session_id() -> String {
        parley_core::id::new_id("session")
    }

    /// Look up the working provider for a session.
    ///
    /// Refreshes `last_used` on hit. A lazily-expired entry is deleted and
    /// reported as a miss.
    pub fn get(&self, session_id: &str) -> Option<AffinityEntry> {
        let mut entries = self.entries.write();
        match entries.get_mut(session_id) {
            Some(entry) => {
                if entry.last_used.elapsed() > self.ttl {
                    entries.remove(session_id);
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    None
                } else {
                    entry.last_used = Instant::now();
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    Some(entry.clone())
                }
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store the working provider key for a session.
    ///
    /// Upsert: `created_at` and `request_count` survive updates for the
    /// same session; `request_count` is incremented and any previous error
    /// is cleared.
    pub fn put(&self, session_id: &str, provider_key: &str, kind: ProviderKind) {
        let now = Instant::now();
        {
            let mut entries = self.entries.write();
            let (created_at, request_count) = entries
                .get(session_id)
                .map(|e| (e.created_at, e.request_count))
                .unwrap_or((now, 0));

            entries.insert(
                session_id.to_string(),
                AffinityEntry {
                    session_id: session_id.to_string(),
                    provider_key: provider_key.to_string(),
                    kind,
                    created_at,
                    last_used: now,
                    request_count: request_count + 1,
                    last_error: None,
                },
            );
        }
        self.enforce_cap();
    }

    /// Drop a session's affinity (e.g. after its cached provider failed).
    pub fn evict(&self, session_id: &str) {
        self.entries.write().remove(session_id);
    }

    /// Attach an error message to a session without evicting it.
    pub fn record_error(&self, session_id: &str, error: &str) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get_mut(session_id) {
            entry.last_error = Some(error.to_string());
            entry.last_used = Instant::now();
        }
    }

    /// Remove expired entries and enforce the population cap.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let before = self.len();
        {
            let mut entries = self.entries.write();
            let ttl = self.ttl;
            entries.retain(|_, e| e.last_used.elapsed() <= ttl);
        }
        self.enforce_cap();
        let removed = before - self.len();
        if removed > 0 {
            debug!(removed, remaining = self.len(), "affinity cache swept");
        }
        removed
    }

    /// Evict strictly-oldest entries (by `last_used`) until under cap.
    fn enforce_cap(&self) {
        let mut entries = self.entries.write();
        if entries.len() <= self.max_entries {
            return;
        }
        let excess = entries.len() - self.max_entries;
        let mut by_idle: Vec<(String, Instant)> = entries
            .iter()
            .map(|(id, e)| (id.clone(), e.last_used))
            .collect();
        by_idle.sort_by_key(|(_, last_used)| *last_used);
        for (id, _) in by_idle.into_iter().take(excess) {
            entries.remove(&id);
        }
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Statistics for one session, if present.
    pub fn session_stats(&self, session_id: &str) -> Option<SessionStats> {
        let entries = self.entries.read();
        entries.get(session_id).map(|e| SessionStats {
            request_count: e.request_count,
            provider: e.kind,
            age_secs: e.created_at.elapsed().as_secs(),
        })
    }

    /// Aggregate statistics over all live entries.
    pub fn manager_stats(&self) -> ManagerStats {
        let entries = self.entries.read();
        let mut gemini = 0usize;
        let mut deepseek = 0usize;
        let mut total_age = Duration::ZERO;
        let mut total_requests = 0u64;

        for entry in entries.values() {
            match entry.kind {
                ProviderKind::Gemini => gemini += 1,
                ProviderKind::Deepseek => deepseek += 1,
            }
            total_age += entry.created_at.elapsed();
            total_requests += entry.request_count;
        }

        let total = entries.len();
        ManagerStats {
            total_sessions: total,
            gemini_sessions: gemini,
            deepseek_sessions: deepseek,
            average_age_secs: if total == 0 {
                0.0
            } else {
                total_age.as_secs_f64() / total as f64
            },
            total_requests,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> AffinityCache {
        AffinityCache::new(Duration::from_secs(60), 100)
    }

    #[test]
    fn put_then_get() {
        let cache = cache();
        cache.put("s1", "keyA", ProviderKind::Gemini);

        let entry = cache.get("s1").unwrap();
        assert_eq!(entry.provider_key, "keyA");
        assert_eq!(entry.kind, ProviderKind::Gemini);
        assert_eq!(entry.request_count, 1);

        assert!(cache.get("s2").is_none());
    }

    #[test]
    fn ttl_expiry_deletes_on_read() {
        let cache = AffinityCache::new(Duration::from_millis(20), 100);
        cache.put("s1", "keyA", ProviderKind::Gemini);
        assert!(cache.get("s1").is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("s1").is_none());
        // Lazily-expired entry is gone, not just hidden.
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn upsert_preserves_created_at_and_counts() {
        let cache = cache();
        cache.put("s1", "keyA", ProviderKind::Gemini);
        let first = cache.get("s1").unwrap();

        cache.put("s1", "keyB", ProviderKind::Deepseek);
        let second = cache.get("s1").unwrap();

        assert_eq!(second.provider_key, "keyB");
        assert_eq!(second.kind, ProviderKind::Deepseek);
        assert_eq!(second.request_count, 2);
        assert_eq!(second.created_at, first.created_at);
    }

    #[test]
    fn put_clears_previous_error() {
        let cache = cache();
        cache.put("s1", "keyA", ProviderKind::Gemini);
        cache.record_error("s1", "HTTP 503");
        assert_eq!(
            cache.get("s1").unwrap().last_error.as_deref(),
            Some("HTTP 503")
        );

        cache.put("s1", "keyA", ProviderKind::Gemini);
        assert!(cache.get("s1").unwrap().last_error.is_none());
    }

    #[test]
    fn evict_removes_entry() {
        let cache = cache();
        cache.put("s1", "keyA", ProviderKind::Gemini);
        cache.evict("s1");
        assert!(cache.get("s1").is_none());
    }

    #[test]
    fn cap_evicts_oldest_by_last_used() {
        let cache = AffinityCache::new(Duration::from_secs(60), 3);
        for i in 0..3 {
            cache.put(&format!("s{i}"), "key", ProviderKind::Gemini);
            std::thread::sleep(Duration::from_millis(5));
        }
        // Touch s0 so s1 becomes the oldest.
        cache.get("s0");

        cache.put("s3", "key", ProviderKind::Deepseek);
        assert_eq!(cache.len(), 3);
        assert!(cache.get("s1").is_none(), "oldest-idle entry evicted");
        assert!(cache.get("s0").is_some());
        assert!(cache.get("s3").is_some());
    }

    #[test]
    fn sweep_removes_expired() {
        let cache = AffinityCache::new(Duration::from_millis(20), 100);
        cache.put("s1", "keyA", ProviderKind::Gemini);
        cache.put("s2", "keyB", ProviderKind::Deepseek);

        std::thread::sleep(Duration::from_millis(40));
        cache.put("s3", "keyC", ProviderKind::Gemini);

        let removed = cache.sweep();
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn manager_stats_aggregate() {
        let cache = cache();
        cache.put("s1", "a", ProviderKind::Gemini);
        cache.put("s2", "b", ProviderKind::Gemini);
        cache.put("s3", "c", ProviderKind::Deepseek);
        cache.get("s1");
        cache.get("nope");

        let stats = cache.manager_stats();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.gemini_sessions, 2);
        assert_eq!(stats.deepseek_sessions, 1);
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn session_ids_are_unique() {
        let a = AffinityCache::generate_session_id();
        let b = AffinityCache::generate_session_id();
        assert!(a.starts_with("session_"));
        assert_ne!(a, b);
    }

    #[test]
    fn send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AffinityCache>();
    }
}

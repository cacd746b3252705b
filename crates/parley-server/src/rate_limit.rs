//! Per-identity request throttling.
//!
//! Fixed windows aligned to the limiter's start: each identity gets a
//! counter in the current window bucket, and a bucket from an earlier
//! window counts as empty. Buckets are reset lazily on the next request
//! and dropped by [`RateLimiter::sweep`], which the server drives from
//! its background task alongside the affinity-cache sweep.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    /// Window index this bucket belongs to.
    window: u64,
    count: u32,
}

/// Fixed-window request limiter keyed by authenticated identity.
///
/// Thread-safe; share via `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: RwLock<HashMap<String, Bucket>>,
    max_requests: u32,
    window: Duration,
    started: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            max_requests,
            window,
            started: Instant::now(),
        }
    }

    /// Index of the window containing "now".
    fn current_window(&self) -> u64 {
        let window_ms = self.window.as_millis().max(1);
        (self.started.elapsed().as_millis() / window_ms) as u64
    }

    /// Admit or reject one request for `identity`.
    ///
    /// Admission charges the identity's counter for the current window;
    /// a counter left over from an earlier window is restarted at zero
    /// before the check.
    pub fn allow(&self, identity: &str) -> bool {
        let window = self.current_window();
        let mut buckets = self.buckets.write();
        let bucket = buckets
            .entry(identity.to_string())
            .or_insert(Bucket { window, count: 0 });

        if bucket.window != window {
            bucket.window = window;
            bucket.count = 0;
        }
        if bucket.count >= self.max_requests {
            return false;
        }
        bucket.count += 1;
        true
    }

    /// Drop buckets from past windows. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let window = self.current_window();
        let mut buckets = self.buckets.write();
        let before = buckets.len();
        buckets.retain(|_, b| b.window == window);
        before - buckets.len()
    }

    /// Number of identities currently tracked.
    pub fn len(&self) -> usize {
        self.buckets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));

        for i in 0..5 {
            assert!(limiter.allow("user-1"), "request {i} should be admitted");
        }
        assert!(!limiter.allow("user-1"));
        // Still rejected; rejection does not consume anything.
        assert!(!limiter.allow("user-1"));
    }

    #[test]
    fn identities_do_not_share_windows() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));

        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));

        // "b" is unaffected by "a" exhausting its allowance.
        assert!(limiter.allow("b"));
        assert!(limiter.allow("b"));
        assert!(!limiter.allow("b"));
    }

    #[test]
    fn counter_restarts_in_the_next_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(30));

        assert!(limiter.allow("user-1"));
        assert!(!limiter.allow("user-1"));

        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.allow("user-1"));
    }

    #[test]
    fn sweep_drops_only_stale_buckets() {
        let limiter = RateLimiter::new(10, Duration::from_millis(30));
        limiter.allow("old");

        std::thread::sleep(Duration::from_millis(40));
        limiter.allow("fresh");

        assert_eq!(limiter.len(), 2);
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.len(), 1);
        // The surviving identity keeps its current-window count.
        assert!(limiter.allow("fresh"));
    }
}

//! Daily quota tracking.
//!
//! Rollover happens on UTC calendar-date change (string-date semantics from
//! the stored data), not a rolling 24h window. A request is charged against
//! quota only after the upstream provider call succeeded; the gatekeeper
//! therefore calls [`QuotaTracker::check`] before dispatch and
//! [`QuotaTracker::consume`] after.

use std::sync::Arc;

use parley_core::date::same_utc_day;
use parley_core::plan::UNLIMITED;
use parley_store::{ActivityRecord, BatchWrite, Store, UserPatch, UserRecord, UserStore, WriteBatch};
use tracing::debug;

use crate::error::EntitlementError;

/// Whether the daily counter must be treated as reset at `now`.
///
/// True iff there is no recorded last message, or its calendar date differs
/// from today's.
pub fn should_reset(last_message_date: Option<i64>, now: i64) -> bool {
    match last_message_date {
        None => true,
        Some(last) => !same_utc_day(last, now),
    }
}

/// Messages remaining today under `limit`, accounting for rollover.
///
/// Returns [`UNLIMITED`] when the limit itself is unlimited.
pub fn quota_remaining(user: &UserRecord, limit: i32, now: i64) -> i32 {
    if limit == UNLIMITED {
        return UNLIMITED;
    }
    let count = effective_count(user, now);
    (limit - count as i32).max(0)
}

/// The daily count after applying rollover (but before any increment).
fn effective_count(user: &UserRecord, now: i64) -> u32 {
    if should_reset(user.last_message_date, now) {
        0
    } else {
        user.daily_message_count
    }
}

/// Result of a successful consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOutcome {
    /// Daily count after the increment.
    pub daily_count: u32,
    /// Remaining allowance after the increment; [`UNLIMITED`] if unlimited.
    pub remaining: i32,
}

/// Persists quota consumption against the store.
pub struct QuotaTracker<S: Store> {
    store: Arc<S>,
}

impl<S: Store> QuotaTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Would a consume at `now` succeed? Does not write.
    pub fn check(&self, user: &UserRecord, limit: i32, now: i64) -> Result<(), EntitlementError> {
        if limit == UNLIMITED {
            return Ok(());
        }
        if effective_count(user, now) as i32 >= limit {
            return Err(EntitlementError::QuotaExceeded { limit });
        }
        Ok(())
    }

    /// Charge one message against the user's quota.
    ///
    /// Fails with `QuotaExceeded` without writing if the allowance is
    /// exhausted (re-checked here: the earlier gatekeeper check and this
    /// write can straddle a day boundary or a concurrent request). On
    /// success, increments both counters, stamps `last_message_date`, and
    /// appends a `message_sent` activity entry in one batch.
    pub async fn consume(
        &self,
        user: &UserRecord,
        limit: i32,
        now: i64,
    ) -> Result<ConsumeOutcome, EntitlementError> {
        self.check(user, limit, now)?;

        let reset = should_reset(user.last_message_date, now);
        let daily_count = if reset { 1 } else { user.daily_message_count + 1 };
        let message_count = user.message_count + 1;

        let patch = UserPatch {
            daily_message_count: Some(daily_count),
            message_count: Some(message_count),
            last_message_date: Some(now),
            updated_at: Some(now),
            ..UserPatch::default()
        };
        let activity = ActivityRecord::new(
            user.uid.clone(),
            "message_sent",
            serde_json::json!({
                "dailyCount": daily_count,
                "totalCount": message_count,
                "resetDaily": reset,
            }),
            now,
        );

        self.store
            .commit(
                WriteBatch::new()
                    .patch_user(user.uid.clone(), patch)
                    .append_activity(activity),
            )
            .await?;

        debug!(uid = %user.uid, daily_count, reset, "message consumed");

        let remaining = if limit == UNLIMITED {
            UNLIMITED
        } else {
            (limit - daily_count as i32).max(0)
        };
        Ok(ConsumeOutcome {
            daily_count,
            remaining,
        })
    }

    /// Zero every stale daily counter (last message on a previous calendar
    /// day but a non-zero count). Returns the affected user ids.
    ///
    /// `last_message_date` is left untouched so a later consume still sees
    /// the rollover.
    pub async fn reset_stale_counts(&self, now: i64) -> Result<Vec<String>, EntitlementError> {
        let users = self.store.list_users().await?;
        let mut reset = Vec::new();
        for user in users {
            if user.daily_message_count > 0 && should_reset(user.last_message_date, now) {
                let patch = UserPatch {
                    daily_message_count: Some(0),
                    updated_at: Some(now),
                    ..UserPatch::default()
                };
                self.store.patch_user(&user.uid, patch).await?;
                reset.push(user.uid);
            }
        }
        if !reset.is_empty() {
            debug!(count = reset.len(), "stale daily counters reset");
        }
        Ok(reset)
    }

    /// Reset the user's daily counter to zero immediately.
    pub async fn reset_daily(&self, uid: &str, now: i64) -> Result<(), EntitlementError> {
        let patch = UserPatch {
            daily_message_count: Some(0),
            last_message_date: Some(now),
            updated_at: Some(now),
            ..UserPatch::default()
        };
        self.store.patch_user(uid, patch).await?;
        Ok(())
    }
}

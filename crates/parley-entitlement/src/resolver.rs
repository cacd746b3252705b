//! Point-in-time entitlement resolution.

use parley_core::plan::{FeatureFlags, Plan, SubscriptionStatus, daily_limit};
use parley_store::{SubscriptionRecord, UserRecord};
use serde::Serialize;
use tracing::debug;

/// The resolved, point-in-time set of capabilities and quotas a user has.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub plan: Plan,
    /// Daily message limit; `-1` means unlimited.
    pub daily_limit: i32,
    pub features: FeatureFlags,
    /// True when an active-status subscription was found lapsed during this
    /// resolution.
    pub subscription_expired: bool,
}

impl Entitlement {
    #[inline]
    pub fn has_unlimited_messages(&self) -> bool {
        self.daily_limit == parley_core::plan::UNLIMITED
    }
}

/// Side-effect the caller must execute when an expired subscription was
/// detected: flip the subscription to expired and downgrade the user.
///
/// The correction is idempotent — repeated resolutions converge on the same
/// persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DowngradeIntent {
    pub uid: String,
    pub subscription_id: String,
}

/// Result of [`resolve`].
#[derive(Debug, Clone)]
pub struct Resolution {
    pub entitlement: Entitlement,
    /// Present when the caller must persist a downgrade before trusting
    /// the entitlement for anything durable.
    pub downgrade: Option<DowngradeIntent>,
}

/// Compute the effective entitlement for a user and their active
/// subscription (if any) at `now`.
///
/// Never mutates anything; expiry is reported back as a [`DowngradeIntent`]
/// for the subscription lifecycle manager to execute transactionally.
///
/// The stored `user.features` snapshot is intentionally ignored — flags are
/// re-derived from the effective plan on every call.
pub fn resolve(user: &UserRecord, active: Option<&SubscriptionRecord>, now: i64) -> Resolution {
    if let Some(sub) = active {
        if sub.status == SubscriptionStatus::Active && sub.is_lapsed(now) {
            debug!(
                uid = %user.uid,
                subscription = %sub.id,
                end_date = sub.end_date,
                "active subscription lapsed, resolving as free"
            );
            return Resolution {
                entitlement: Entitlement {
                    plan: Plan::Free,
                    daily_limit: daily_limit(Plan::Free, SubscriptionStatus::Expired),
                    features: FeatureFlags::free(),
                    subscription_expired: true,
                },
                downgrade: Some(DowngradeIntent {
                    uid: user.uid.clone(),
                    subscription_id: sub.id.clone(),
                }),
            };
        }
    }

    let plan = user.plan;
    // A paid plan without an active subscription keeps its label but
    // grants nothing: free-tier features and the free-tier limit.
    let features = if plan.is_paid() && user.subscription_status != SubscriptionStatus::Active {
        FeatureFlags::free()
    } else {
        FeatureFlags::for_plan(plan)
    };
    Resolution {
        entitlement: Entitlement {
            plan,
            daily_limit: daily_limit(plan, user.subscription_status),
            features,
            subscription_expired: false,
        },
        downgrade: None,
    }
}

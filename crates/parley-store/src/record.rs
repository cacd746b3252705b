//! Typed document records.
//!
//! Stored documents historically grew fields over time, so everything a
//! legacy document may lack is optional or defaulted; readers must handle
//! the missing cases explicitly instead of trusting the stored shape.

use parley_core::plan::{Currency, FeatureFlags, PaymentMethod, Plan, SubscriptionStatus};
use serde::{Deserialize, Serialize};

/// One user document per identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
    /// Lifetime message counter, monotonically non-decreasing.
    #[serde(default)]
    pub message_count: u64,
    /// Messages sent on the calendar day of `last_message_date`.
    #[serde(default)]
    pub daily_message_count: u32,
    /// Unix seconds of the last successful message; drives day rollover.
    #[serde(default)]
    pub last_message_date: Option<i64>,
    /// Denormalized capability snapshot. Never authoritative — re-derived
    /// from `{plan, subscription_status}` on every entitlement resolution.
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl UserRecord {
    /// A fresh free-tier user, as created on first sign-in.
    pub fn new_free(uid: impl Into<String>, email: Option<String>, now: i64) -> Self {
        Self {
            uid: uid.into(),
            email,
            display_name: None,
            plan: Plan::Free,
            subscription_status: SubscriptionStatus::Inactive,
            message_count: 0,
            daily_message_count: 0,
            last_message_date: None,
            features: FeatureFlags::free(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Subscription document. Zero or more per user; the application keeps at
/// most one in `Active` status at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: String,
    pub uid: String,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub payment_method: PaymentMethod,
    pub amount: f64,
    pub currency: Currency,
    /// Unix seconds.
    pub start_date: i64,
    /// Unix seconds; 0 = not yet scheduled.
    pub end_date: i64,
    #[serde(default)]
    pub auto_renew: bool,
    /// Present only while `status == PendingActivation`.
    #[serde(default)]
    pub activation_token: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SubscriptionRecord {
    /// Whether the billing period has lapsed at `now`.
    #[inline]
    pub fn is_lapsed(&self, now: i64) -> bool {
        self.end_date > 0 && now > self.end_date
    }
}

/// Outcome of a payment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
    Pending,
}

/// Append-only payment audit entry. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub uid: String,
    pub subscription_id: String,
    pub amount: f64,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: String,
    pub created_at: i64,
}

/// Append-only user activity audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: String,
    pub uid: String,
    /// Short action tag, e.g. `message_sent`, `subscription_expired`.
    pub action: String,
    /// Free-form structured detail.
    #[serde(default)]
    pub detail: serde_json::Value,
    pub created_at: i64,
}

impl ActivityRecord {
    pub fn new(
        uid: impl Into<String>,
        action: impl Into<String>,
        detail: serde_json::Value,
        now: i64,
    ) -> Self {
        Self {
            id: parley_core::id::new_id("act"),
            uid: uid.into(),
            action: action.into(),
            detail,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_user_document_deserializes() {
        // Early documents had none of the stats or feature fields.
        let json = r#"{"uid":"u1","plan":"pro"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.plan, Plan::Pro);
        assert_eq!(user.subscription_status, SubscriptionStatus::Inactive);
        assert_eq!(user.daily_message_count, 0);
        assert!(user.last_message_date.is_none());
        assert!(!user.features.premium_personas);
    }

    #[test]
    fn lapse_check_ignores_unscheduled_end_date() {
        let sub = SubscriptionRecord {
            id: "s1".into(),
            uid: "u1".into(),
            plan: Plan::Pro,
            status: SubscriptionStatus::Active,
            payment_method: PaymentMethod::Stripe,
            amount: 2.5,
            currency: Currency::Usd,
            start_date: 100,
            end_date: 0,
            auto_renew: true,
            activation_token: None,
            created_at: 100,
            updated_at: 100,
        };
        assert!(!sub.is_lapsed(1_000_000));

        let sub = SubscriptionRecord { end_date: 200, ..sub };
        assert!(sub.is_lapsed(201));
        assert!(!sub.is_lapsed(200));
    }
}

//! Atomic multi-document writes.
//!
//! A [`WriteBatch`] collects mutations that a backend applies all-or-nothing
//! via [`BatchWrite::commit`](crate::BatchWrite::commit). Patches carry only
//! the fields being changed so concurrent writers to different fields do not
//! clobber each other.

use parley_core::plan::{FeatureFlags, Plan, SubscriptionStatus};

use crate::record::{ActivityRecord, PaymentRecord, SubscriptionRecord, UserRecord};

/// Partial update of a user document.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub plan: Option<Plan>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub features: Option<FeatureFlags>,
    pub daily_message_count: Option<u32>,
    pub message_count: Option<u64>,
    pub last_message_date: Option<i64>,
    pub updated_at: Option<i64>,
}

impl UserPatch {
    /// The downgrade-to-free patch applied when a subscription lapses.
    pub fn downgrade_to_free(now: i64) -> Self {
        Self {
            plan: Some(Plan::Free),
            subscription_status: Some(SubscriptionStatus::Expired),
            features: Some(FeatureFlags::free()),
            updated_at: Some(now),
            ..Self::default()
        }
    }

    pub fn apply(&self, user: &mut UserRecord) {
        if let Some(plan) = self.plan {
            user.plan = plan;
        }
        if let Some(status) = self.subscription_status {
            user.subscription_status = status;
        }
        if let Some(features) = self.features {
            user.features = features;
        }
        if let Some(count) = self.daily_message_count {
            user.daily_message_count = count;
        }
        if let Some(count) = self.message_count {
            user.message_count = count;
        }
        if let Some(ts) = self.last_message_date {
            user.last_message_date = Some(ts);
        }
        if let Some(ts) = self.updated_at {
            user.updated_at = ts;
        }
    }
}

/// Partial update of a subscription document.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionPatch {
    pub status: Option<SubscriptionStatus>,
    pub auto_renew: Option<bool>,
    pub end_date: Option<i64>,
    /// Consume the activation token (set it to `None`).
    pub clear_activation_token: bool,
    pub updated_at: Option<i64>,
}

impl SubscriptionPatch {
    pub fn apply(&self, sub: &mut SubscriptionRecord) {
        if let Some(status) = self.status {
            sub.status = status;
        }
        if let Some(auto_renew) = self.auto_renew {
            sub.auto_renew = auto_renew;
        }
        if let Some(end_date) = self.end_date {
            sub.end_date = end_date;
        }
        if self.clear_activation_token {
            sub.activation_token = None;
        }
        if let Some(ts) = self.updated_at {
            sub.updated_at = ts;
        }
    }
}

/// A single mutation within a batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    PutUser(UserRecord),
    PatchUser { uid: String, patch: UserPatch },
    PutSubscription(SubscriptionRecord),
    PatchSubscription { id: String, patch: SubscriptionPatch },
    AppendPayment(PaymentRecord),
    AppendActivity(ActivityRecord),
}

/// An ordered collection of mutations applied atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_user(mut self, user: UserRecord) -> Self {
        self.ops.push(WriteOp::PutUser(user));
        self
    }

    pub fn patch_user(mut self, uid: impl Into<String>, patch: UserPatch) -> Self {
        self.ops.push(WriteOp::PatchUser {
            uid: uid.into(),
            patch,
        });
        self
    }

    pub fn put_subscription(mut self, sub: SubscriptionRecord) -> Self {
        self.ops.push(WriteOp::PutSubscription(sub));
        self
    }

    pub fn patch_subscription(mut self, id: impl Into<String>, patch: SubscriptionPatch) -> Self {
        self.ops.push(WriteOp::PatchSubscription {
            id: id.into(),
            patch,
        });
        self
    }

    pub fn append_payment(mut self, payment: PaymentRecord) -> Self {
        self.ops.push(WriteOp::AppendPayment(payment));
        self
    }

    pub fn append_activity(mut self, activity: ActivityRecord) -> Self {
        self.ops.push(WriteOp::AppendActivity(activity));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

//! In-memory store backend.
//!
//! Suitable for tests and single-node deployments. All collections sit
//! behind one lock so a committed batch is atomic with respect to every
//! reader.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use parley_core::plan::SubscriptionStatus;

use crate::batch::{SubscriptionPatch, UserPatch, WriteBatch, WriteOp};
use crate::error::StoreError;
use crate::record::{ActivityRecord, PaymentRecord, SubscriptionRecord, UserRecord};
use crate::traits::{ActivityLog, BatchWrite, PaymentStore, SubscriptionStore, UserStore};

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<String, UserRecord>,
    subscriptions: HashMap<String, SubscriptionRecord>,
    payments: Vec<PaymentRecord>,
    activities: Vec<ActivityRecord>,
}

/// In-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of user documents (tests).
    pub fn user_count(&self) -> usize {
        self.inner.read().users.len()
    }
}

fn apply_op(cols: &mut Collections, op: WriteOp) {
    match op {
        WriteOp::PutUser(user) => {
            cols.users.insert(user.uid.clone(), user);
        }
        WriteOp::PatchUser { uid, patch } => {
            if let Some(user) = cols.users.get_mut(&uid) {
                patch.apply(user);
            }
        }
        WriteOp::PutSubscription(sub) => {
            cols.subscriptions.insert(sub.id.clone(), sub);
        }
        WriteOp::PatchSubscription { id, patch } => {
            if let Some(sub) = cols.subscriptions.get_mut(&id) {
                patch.apply(sub);
            }
        }
        WriteOp::AppendPayment(payment) => cols.payments.push(payment),
        WriteOp::AppendActivity(activity) => cols.activities.push(activity),
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.inner.read().users.get(uid).cloned())
    }

    async fn put_user(&self, user: UserRecord) -> Result<(), StoreError> {
        self.inner.write().users.insert(user.uid.clone(), user);
        Ok(())
    }

    async fn patch_user(&self, uid: &str, patch: UserPatch) -> Result<(), StoreError> {
        let mut cols = self.inner.write();
        let user = cols
            .users
            .get_mut(uid)
            .ok_or_else(|| StoreError::not_found("user", uid))?;
        patch.apply(user);
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.inner.read().users.values().cloned().collect())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn get_subscription(&self, id: &str) -> Result<Option<SubscriptionRecord>, StoreError> {
        Ok(self.inner.read().subscriptions.get(id).cloned())
    }

    async fn active_subscription(
        &self,
        uid: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let cols = self.inner.read();
        Ok(cols
            .subscriptions
            .values()
            .filter(|s| s.uid == uid && s.status == SubscriptionStatus::Active)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn list_active_subscriptions(&self) -> Result<Vec<SubscriptionRecord>, StoreError> {
        let cols = self.inner.read();
        Ok(cols
            .subscriptions
            .values()
            .filter(|s| s.status == SubscriptionStatus::Active)
            .cloned()
            .collect())
    }

    async fn put_subscription(&self, sub: SubscriptionRecord) -> Result<(), StoreError> {
        self.inner.write().subscriptions.insert(sub.id.clone(), sub);
        Ok(())
    }

    async fn patch_subscription(
        &self,
        id: &str,
        patch: SubscriptionPatch,
    ) -> Result<(), StoreError> {
        let mut cols = self.inner.write();
        let sub = cols
            .subscriptions
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("subscription", id))?;
        patch.apply(sub);
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn append_payment(&self, payment: PaymentRecord) -> Result<(), StoreError> {
        self.inner.write().payments.push(payment);
        Ok(())
    }

    async fn payment_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let cols = self.inner.read();
        Ok(cols
            .payments
            .iter()
            .find(|p| p.transaction_id == transaction_id)
            .cloned())
    }
}

#[async_trait]
impl ActivityLog for MemoryStore {
    async fn append_activity(&self, activity: ActivityRecord) -> Result<(), StoreError> {
        self.inner.write().activities.push(activity);
        Ok(())
    }

    async fn activities_for(&self, uid: &str) -> Result<Vec<ActivityRecord>, StoreError> {
        let cols = self.inner.read();
        Ok(cols
            .activities
            .iter()
            .filter(|a| a.uid == uid)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BatchWrite for MemoryStore {
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut cols = self.inner.write();

        // Validate patch targets first so the batch is all-or-nothing.
        for op in batch.ops() {
            match op {
                WriteOp::PatchUser { uid, .. } if !cols.users.contains_key(uid) => {
                    return Err(StoreError::not_found("user", uid.clone()));
                }
                WriteOp::PatchSubscription { id, .. } if !cols.subscriptions.contains_key(id) => {
                    return Err(StoreError::not_found("subscription", id.clone()));
                }
                _ => {}
            }
        }

        for op in batch.into_ops() {
            apply_op(&mut cols, op);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::plan::{Currency, PaymentMethod, Plan};

    fn sub(id: &str, uid: &str, status: SubscriptionStatus, created_at: i64) -> SubscriptionRecord {
        SubscriptionRecord {
            id: id.into(),
            uid: uid.into(),
            plan: Plan::Pro,
            status,
            payment_method: PaymentMethod::Stripe,
            amount: 2.5,
            currency: Currency::Usd,
            start_date: created_at,
            end_date: created_at + 100,
            auto_renew: true,
            activation_token: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn put_get_user() {
        let store = MemoryStore::new();
        store
            .put_user(UserRecord::new_free("u1", None, 1000))
            .await
            .unwrap();

        let user = store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.plan, Plan::Free);
        assert!(store.get_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn patch_missing_user_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .patch_user("ghost", UserPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn active_subscription_picks_latest() {
        let store = MemoryStore::new();
        store.put_subscription(sub("s1", "u1", SubscriptionStatus::Active, 100)).await.unwrap();
        store.put_subscription(sub("s2", "u1", SubscriptionStatus::Active, 200)).await.unwrap();
        store.put_subscription(sub("s3", "u1", SubscriptionStatus::Expired, 300)).await.unwrap();
        store.put_subscription(sub("s4", "u2", SubscriptionStatus::Active, 400)).await.unwrap();

        let active = store.active_subscription("u1").await.unwrap().unwrap();
        assert_eq!(active.id, "s2");
    }

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let store = MemoryStore::new();
        store
            .put_user(UserRecord::new_free("u1", None, 1000))
            .await
            .unwrap();

        // Second op targets a missing subscription, so the user patch must
        // not be applied either.
        let batch = WriteBatch::new()
            .patch_user(
                "u1",
                UserPatch {
                    plan: Some(Plan::Pro),
                    ..UserPatch::default()
                },
            )
            .patch_subscription("missing", SubscriptionPatch::default());

        assert!(store.commit(batch).await.is_err());
        let user = store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.plan, Plan::Free);
    }

    #[tokio::test]
    async fn batch_applies_everything() {
        let store = MemoryStore::new();
        store
            .put_user(UserRecord::new_free("u1", None, 1000))
            .await
            .unwrap();

        let batch = WriteBatch::new()
            .patch_user("u1", UserPatch::downgrade_to_free(2000))
            .put_subscription(sub("s1", "u1", SubscriptionStatus::Expired, 100))
            .append_activity(ActivityRecord::new(
                "u1",
                "subscription_expired",
                serde_json::json!({}),
                2000,
            ));
        store.commit(batch).await.unwrap();

        let user = store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.subscription_status, SubscriptionStatus::Expired);
        assert_eq!(user.updated_at, 2000);
        assert_eq!(store.activities_for("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn payment_lookup_by_transaction() {
        let store = MemoryStore::new();
        store
            .append_payment(PaymentRecord {
                id: "p1".into(),
                uid: "u1".into(),
                subscription_id: "s1".into(),
                amount: 2.5,
                currency: Currency::Usd,
                payment_method: PaymentMethod::Stripe,
                status: crate::record::PaymentStatus::Success,
                transaction_id: "tx_1".into(),
                created_at: 100,
            })
            .await
            .unwrap();

        assert!(store.payment_by_transaction("tx_1").await.unwrap().is_some());
        assert!(store.payment_by_transaction("tx_2").await.unwrap().is_none());
    }
}

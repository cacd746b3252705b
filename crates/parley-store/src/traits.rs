//! Data-access traits for the document store.
//!
//! Implementations provide data retrieval and persistence only. Business
//! rules (entitlement, quota, lifecycle transitions) live in the crates
//! that consume these traits.

use async_trait::async_trait;

use crate::batch::{SubscriptionPatch, UserPatch, WriteBatch};
use crate::error::StoreError;
use crate::record::{ActivityRecord, PaymentRecord, SubscriptionRecord, UserRecord};

/// User document access.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user by id. Returns `None` if no document exists.
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Create or replace a user document.
    async fn put_user(&self, user: UserRecord) -> Result<(), StoreError>;

    /// Apply a partial update to an existing user document.
    async fn patch_user(&self, uid: &str, patch: UserPatch) -> Result<(), StoreError>;

    /// All user documents (sweeps only; not a hot path).
    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;
}

/// Subscription document access.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get_subscription(&self, id: &str) -> Result<Option<SubscriptionRecord>, StoreError>;

    /// The most recently created active subscription for a user, if any.
    async fn active_subscription(&self, uid: &str)
        -> Result<Option<SubscriptionRecord>, StoreError>;

    /// All subscriptions currently in `Active` status (expiry sweep input).
    async fn list_active_subscriptions(&self) -> Result<Vec<SubscriptionRecord>, StoreError>;

    async fn put_subscription(&self, sub: SubscriptionRecord) -> Result<(), StoreError>;

    async fn patch_subscription(
        &self,
        id: &str,
        patch: SubscriptionPatch,
    ) -> Result<(), StoreError>;
}

/// Append-only payment audit log.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn append_payment(&self, payment: PaymentRecord) -> Result<(), StoreError>;

    /// Look up a payment by external transaction id (idempotency check).
    async fn payment_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError>;
}

/// Append-only user activity audit trail.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append_activity(&self, activity: ActivityRecord) -> Result<(), StoreError>;

    /// Activities for a user, oldest first (tests and support tooling).
    async fn activities_for(&self, uid: &str) -> Result<Vec<ActivityRecord>, StoreError>;
}

/// Atomic multi-document writes.
#[async_trait]
pub trait BatchWrite: Send + Sync {
    /// Apply every op in the batch, or none of them.
    ///
    /// A patch whose target document is missing fails the whole batch.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// The full store surface the application composes against.
pub trait Store:
    UserStore + SubscriptionStore + PaymentStore + ActivityLog + BatchWrite
{
}

impl<T> Store for T where
    T: UserStore + SubscriptionStore + PaymentStore + ActivityLog + BatchWrite
{
}

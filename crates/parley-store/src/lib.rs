//! Document-store abstraction for parley.
//!
//! The durable store (users, subscriptions, payments, activity log) is an
//! external collaborator; this crate provides:
//!
//! - [`UserRecord`] / [`SubscriptionRecord`] / [`PaymentRecord`] /
//!   [`ActivityRecord`] — explicit typed documents
//! - [`UserStore`] / [`SubscriptionStore`] / [`PaymentStore`] /
//!   [`ActivityLog`] — data-access traits (implement these for new backends)
//! - [`WriteBatch`] / [`BatchWrite`] — atomic multi-document writes
//! - [`MemoryStore`] — in-memory backend for tests and single-node runs
//!
//! # Adding a new backend
//!
//! ```ignore
//! use parley_store::{Store, UserStore, StoreError};
//!
//! struct MyStore { /* ... */ }
//!
//! #[async_trait::async_trait]
//! impl UserStore for MyStore {
//!     async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, StoreError> { todo!() }
//!     // ...
//! }
//! ```

mod batch;
mod error;
mod memory;
mod record;
mod traits;

pub use batch::{SubscriptionPatch, UserPatch, WriteBatch, WriteOp};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use record::{
    ActivityRecord, PaymentRecord, PaymentStatus, SubscriptionRecord, UserRecord,
};
pub use traits::{ActivityLog, BatchWrite, PaymentStore, Store, SubscriptionStore, UserStore};

//! Subscription lifecycle state machine.
//!
//! States: `pending_activation → active → {expired, cancelled}`. There is
//! no transition out of a terminal state; a new record is created instead.

use std::sync::Arc;

use parley_core::date::add_months;
use parley_core::id::{new_id, new_token};
use parley_core::plan::{
    Currency, FeatureFlags, PaymentMethod, Plan, SubscriptionStatus, amount_tolerance, plan_price,
};
use parley_store::{
    ActivityRecord, BatchWrite, PaymentRecord, PaymentStatus, PaymentStore, Store,
    SubscriptionPatch, SubscriptionRecord, SubscriptionStore, UserPatch, UserRecord, UserStore,
    WriteBatch,
};
use tracing::{info, warn};

use crate::error::BillingError;

/// Validate a charged amount against the plan price table.
///
/// Tolerant of small currency-dependent deviations to absorb processor
/// fees.
pub fn validate_amount(plan: Plan, amount: f64, currency: Currency) -> Result<(), BillingError> {
    let expected = plan_price(plan, currency).ok_or(BillingError::InvalidPlan)?;
    if (amount - expected).abs() <= amount_tolerance(currency) {
        Ok(())
    } else {
        Err(BillingError::InvalidAmount {
            expected,
            got: amount,
            currency: currency.as_str(),
        })
    }
}

/// Input for a payment-confirmed subscription creation.
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub plan: Plan,
    pub amount: f64,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    /// Provider transaction id; generated when absent. Repeated requests
    /// with the same id are served idempotently.
    pub transaction_id: Option<String>,
}

/// Result of a subscription creation.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub subscription_id: String,
    pub payment_id: String,
    pub plan: Plan,
    pub start_date: i64,
    pub end_date: i64,
    pub features: FeatureFlags,
    /// True when this request matched an already-recorded transaction and
    /// nothing new was written.
    pub replayed: bool,
}

/// Result of a pending-activation creation.
#[derive(Debug, Clone)]
pub struct PendingSubscription {
    pub subscription_id: String,
    pub activation_token: String,
}

/// Owns all durable subscription transitions.
pub struct SubscriptionManager<S: Store> {
    store: Arc<S>,
}

impl<S: Store> SubscriptionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create an active subscription from a confirmed payment.
    ///
    /// Validates the amount, then writes the user update, the subscription,
    /// the payment audit entry and the activity entry in one atomic batch.
    pub async fn create(
        &self,
        req: CreateSubscription,
        now: i64,
    ) -> Result<CreateOutcome, BillingError> {
        if !req.plan.is_paid() {
            return Err(BillingError::InvalidPlan);
        }
        validate_amount(req.plan, req.amount, req.currency)?;

        // Idempotency: a replayed transaction returns the original outcome
        // without writing anything.
        if let Some(ref tx) = req.transaction_id {
            if let Some(existing) = self.store.payment_by_transaction(tx).await? {
                let sub = self
                    .store
                    .get_subscription(&existing.subscription_id)
                    .await?
                    .ok_or(BillingError::NotFound)?;
                info!(uid = %req.uid, transaction = %tx, "payment replayed, returning existing subscription");
                return Ok(CreateOutcome {
                    subscription_id: sub.id.clone(),
                    payment_id: existing.id,
                    plan: sub.plan,
                    start_date: sub.start_date,
                    end_date: sub.end_date,
                    features: FeatureFlags::for_plan(sub.plan),
                    replayed: true,
                });
            }
        }

        let subscription_id = new_id("sub");
        let payment_id = new_id("pay");
        let transaction_id = req
            .transaction_id
            .unwrap_or_else(|| new_id(req.payment_method.as_str()));
        let end_date = add_months(now, 1);
        let features = FeatureFlags::for_plan(req.plan);

        let subscription = SubscriptionRecord {
            id: subscription_id.clone(),
            uid: req.uid.clone(),
            plan: req.plan,
            status: SubscriptionStatus::Active,
            payment_method: req.payment_method,
            amount: req.amount,
            currency: req.currency,
            start_date: now,
            end_date,
            auto_renew: true,
            activation_token: None,
            created_at: now,
            updated_at: now,
        };
        let payment = PaymentRecord {
            id: payment_id.clone(),
            uid: req.uid.clone(),
            subscription_id: subscription_id.clone(),
            amount: req.amount,
            currency: req.currency,
            payment_method: req.payment_method,
            status: PaymentStatus::Success,
            transaction_id,
            created_at: now,
        };
        let activity = ActivityRecord::new(
            req.uid.clone(),
            "subscription_activated",
            serde_json::json!({
                "plan": req.plan,
                "amount": req.amount,
                "currency": req.currency,
                "paymentMethod": req.payment_method,
                "subscriptionId": subscription_id,
                "paymentId": payment_id,
            }),
            now,
        );

        let user_op = match self.store.get_user(&req.uid).await? {
            Some(_) => WriteBatch::new().patch_user(
                req.uid.clone(),
                UserPatch {
                    plan: Some(req.plan),
                    subscription_status: Some(SubscriptionStatus::Active),
                    features: Some(features),
                    updated_at: Some(now),
                    ..UserPatch::default()
                },
            ),
            None => {
                // First payment from an identity we have never served.
                let mut user = UserRecord::new_free(req.uid.clone(), req.email.clone(), now);
                user.display_name = req.display_name.clone();
                user.plan = req.plan;
                user.subscription_status = SubscriptionStatus::Active;
                user.features = features;
                WriteBatch::new().put_user(user)
            }
        };

        let batch = user_op
            .put_subscription(subscription)
            .append_payment(payment)
            .append_activity(activity);
        self.store.commit(batch).await?;

        info!(uid = %req.uid, plan = %req.plan, subscription = %subscription_id, "subscription created");
        Ok(CreateOutcome {
            subscription_id,
            payment_id,
            plan: req.plan,
            start_date: now,
            end_date,
            features,
            replayed: false,
        })
    }

    /// Create a subscription awaiting email activation.
    ///
    /// The user keeps free-tier access until [`activate`](Self::activate)
    /// succeeds with the returned token.
    pub async fn create_pending(
        &self,
        uid: &str,
        plan: Plan,
        now: i64,
    ) -> Result<PendingSubscription, BillingError> {
        if !plan.is_paid() {
            return Err(BillingError::InvalidPlan);
        }
        if self.store.get_user(uid).await?.is_none() {
            return Err(BillingError::NotFound);
        }

        let subscription_id = new_id("sub");
        let activation_token = new_token();

        let subscription = SubscriptionRecord {
            id: subscription_id.clone(),
            uid: uid.to_string(),
            plan,
            status: SubscriptionStatus::PendingActivation,
            payment_method: PaymentMethod::Manual,
            amount: 0.0,
            currency: Currency::Usd,
            start_date: now,
            end_date: add_months(now, 1),
            auto_renew: false,
            activation_token: Some(activation_token.clone()),
            created_at: now,
            updated_at: now,
        };
        let activity = ActivityRecord::new(
            uid,
            "subscription_created",
            serde_json::json!({
                "plan": plan,
                "status": "pending_activation",
                "subscriptionId": subscription_id,
            }),
            now,
        );

        let batch = WriteBatch::new()
            .put_subscription(subscription)
            .patch_user(
                uid,
                UserPatch {
                    plan: Some(plan),
                    subscription_status: Some(SubscriptionStatus::PendingActivation),
                    updated_at: Some(now),
                    ..UserPatch::default()
                },
            )
            .append_activity(activity);
        self.store.commit(batch).await?;

        Ok(PendingSubscription {
            subscription_id,
            activation_token,
        })
    }

    /// Activate a pending subscription with its emailed token.
    ///
    /// Every mismatch is a terminal error; no partial activation.
    pub async fn activate(
        &self,
        uid: &str,
        subscription_id: &str,
        token: &str,
        now: i64,
    ) -> Result<(), BillingError> {
        let sub = self
            .store
            .get_subscription(subscription_id)
            .await?
            .ok_or(BillingError::NotFound)?;

        if sub.uid != uid {
            return Err(BillingError::Unauthorized);
        }
        if sub.activation_token.as_deref() != Some(token) {
            return Err(BillingError::InvalidToken);
        }
        if sub.status != SubscriptionStatus::PendingActivation {
            return Err(BillingError::AlreadyActivated);
        }

        let batch = WriteBatch::new()
            .patch_subscription(
                subscription_id,
                SubscriptionPatch {
                    status: Some(SubscriptionStatus::Active),
                    clear_activation_token: true,
                    updated_at: Some(now),
                    ..SubscriptionPatch::default()
                },
            )
            .patch_user(
                uid,
                UserPatch {
                    plan: Some(sub.plan),
                    subscription_status: Some(SubscriptionStatus::Active),
                    features: Some(FeatureFlags::for_plan(sub.plan)),
                    updated_at: Some(now),
                    ..UserPatch::default()
                },
            )
            .append_activity(ActivityRecord::new(
                uid,
                "subscription_activated",
                serde_json::json!({
                    "plan": sub.plan,
                    "subscriptionId": subscription_id,
                }),
                now,
            ));
        self.store.commit(batch).await?;

        info!(uid, subscription = subscription_id, "subscription activated");
        Ok(())
    }

    /// Cancel a subscription.
    ///
    /// `immediately` downgrades the user right away; otherwise access
    /// continues until `end_date` and the expiry sweep performs the
    /// downgrade.
    pub async fn cancel(
        &self,
        uid: &str,
        subscription_id: &str,
        immediately: bool,
        now: i64,
    ) -> Result<(), BillingError> {
        let sub = self
            .store
            .get_subscription(subscription_id)
            .await?
            .ok_or(BillingError::NotFound)?;
        if sub.uid != uid {
            return Err(BillingError::Unauthorized);
        }

        let sub_patch = SubscriptionPatch {
            status: Some(SubscriptionStatus::Cancelled),
            auto_renew: Some(false),
            updated_at: Some(now),
            ..SubscriptionPatch::default()
        };
        let user_patch = if immediately {
            UserPatch {
                plan: Some(Plan::Free),
                subscription_status: Some(SubscriptionStatus::Inactive),
                features: Some(FeatureFlags::free()),
                updated_at: Some(now),
                ..UserPatch::default()
            }
        } else {
            UserPatch {
                subscription_status: Some(SubscriptionStatus::Cancelled),
                updated_at: Some(now),
                ..UserPatch::default()
            }
        };

        let batch = WriteBatch::new()
            .patch_subscription(subscription_id, sub_patch)
            .patch_user(uid, user_patch)
            .append_activity(ActivityRecord::new(
                uid,
                "subscription_cancelled",
                serde_json::json!({
                    "subscriptionId": subscription_id,
                    "immediate": immediately,
                }),
                now,
            ));
        self.store.commit(batch).await?;
        Ok(())
    }

    /// Persist the downgrade for a subscription found expired during
    /// entitlement resolution.
    ///
    /// Idempotent: if the subscription is no longer active the flip is a
    /// no-op status write and the user patch converges on the same state.
    pub async fn downgrade_expired(
        &self,
        uid: &str,
        subscription_id: &str,
        now: i64,
    ) -> Result<(), BillingError> {
        let batch = WriteBatch::new()
            .patch_subscription(
                subscription_id,
                SubscriptionPatch {
                    status: Some(SubscriptionStatus::Expired),
                    updated_at: Some(now),
                    ..SubscriptionPatch::default()
                },
            )
            .patch_user(uid, UserPatch::downgrade_to_free(now))
            .append_activity(ActivityRecord::new(
                uid,
                "subscription_expired",
                serde_json::json!({
                    "subscriptionId": subscription_id,
                    "downgradedTo": "free",
                }),
                now,
            ));
        self.store.commit(batch).await?;
        warn!(uid, subscription = subscription_id, "expired subscription downgraded");
        Ok(())
    }

    /// Expire every active subscription whose `end_date` has passed and
    /// downgrade the owning users. Returns the affected user ids.
    ///
    /// Safe to re-run: a second sweep finds nothing left to expire.
    pub async fn expire_sweep(&self, now: i64) -> Result<Vec<String>, BillingError> {
        let active = self.store.list_active_subscriptions().await?;
        let mut affected = Vec::new();
        let mut batch = WriteBatch::new();

        for sub in active {
            if !sub.is_lapsed(now) {
                continue;
            }
            batch = batch
                .patch_subscription(
                    sub.id.clone(),
                    SubscriptionPatch {
                        status: Some(SubscriptionStatus::Expired),
                        updated_at: Some(now),
                        ..SubscriptionPatch::default()
                    },
                )
                .patch_user(sub.uid.clone(), UserPatch::downgrade_to_free(now))
                .append_activity(ActivityRecord::new(
                    sub.uid.clone(),
                    "subscription_expired",
                    serde_json::json!({
                        "subscriptionId": sub.id,
                        "plan": sub.plan,
                        "endDate": sub.end_date,
                    }),
                    now,
                ));
            affected.push(sub.uid);
        }

        if !batch.is_empty() {
            self.store.commit(batch).await?;
            info!(expired = affected.len(), "subscription expiry sweep");
        }
        Ok(affected)
    }
}

//! Plan tiers, subscription states, and the capability/pricing tables.
//!
//! This is the single source of truth for what each plan grants. Feature
//! flags stored on a user document are a denormalized snapshot and must be
//! re-derived from here before being trusted.

use serde::{Deserialize, Serialize};

/// Subscription tier a user is nominally assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    ProPlus,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::ProPlus => "pro-plus",
        }
    }

    /// Whether this is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, Plan::Free)
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Plan {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            "pro-plus" | "pro_plus" | "proplus" => Ok(Plan::ProPlus),
            _ => Err(()),
        }
    }
}

/// Lifecycle state of a user's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Inactive,
    Active,
    Expired,
    Cancelled,
    PendingActivation,
    PastDue,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::PendingActivation => "pending_activation",
            SubscriptionStatus::PastDue => "past_due",
        }
    }

    /// Terminal states cannot transition anywhere; a new subscription
    /// record must be created instead.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Expired | SubscriptionStatus::Cancelled)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted payment rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Manual,
    Stripe,
    Paypal,
    Crypto,
    Razorpay,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Manual => "manual",
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Crypto => "crypto",
            PaymentMethod::Razorpay => "razorpay",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported billing currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "INR")]
    Inr,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Inr => "INR",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persona categories a chat request may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaKind {
    #[default]
    Basic,
    Premium,
    Locked,
    Custom,
}

/// Capability flags derived from `{plan, subscription_status}`.
///
/// Serialized with the wire field names the clients already consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    pub basic_personas: bool,
    pub premium_personas: bool,
    pub unlimited_messages: bool,
    pub priority_support: bool,
    pub advanced_analytics: bool,
    pub custom_personas: bool,
    pub api_access: bool,
    pub export_data: bool,
    pub locked_personas: bool,
    pub infinite_chat: bool,
}

impl FeatureFlags {
    /// The capability set for a plan tier.
    pub fn for_plan(plan: Plan) -> Self {
        match plan {
            Plan::Free => Self {
                basic_personas: true,
                ..Self::default()
            },
            Plan::Pro => Self {
                basic_personas: true,
                premium_personas: true,
                unlimited_messages: true,
                priority_support: true,
                advanced_analytics: true,
                custom_personas: false,
                api_access: false,
                export_data: true,
                locked_personas: true,
                infinite_chat: true,
            },
            Plan::ProPlus => Self {
                basic_personas: true,
                premium_personas: true,
                unlimited_messages: true,
                priority_support: true,
                advanced_analytics: true,
                custom_personas: true,
                api_access: true,
                export_data: true,
                locked_personas: true,
                infinite_chat: true,
            },
        }
    }

    /// The free-tier capability set (the downgrade target).
    pub fn free() -> Self {
        Self::for_plan(Plan::Free)
    }

    /// Whether this capability set grants access to a persona category.
    pub fn allows_persona(&self, kind: PersonaKind) -> bool {
        match kind {
            PersonaKind::Basic => self.basic_personas,
            PersonaKind::Premium => self.premium_personas,
            PersonaKind::Locked => self.locked_personas,
            PersonaKind::Custom => self.custom_personas,
        }
    }
}

/// Daily limit sentinel meaning "unlimited".
pub const UNLIMITED: i32 = -1;

/// Free-tier daily message allowance.
pub const FREE_DAILY_LIMIT: i32 = 20;

/// Effective daily message limit for a `{plan, status}` pair.
///
/// Paid plans only get the unlimited sentinel while the subscription is
/// actually active; a lapsed-but-not-yet-swept pro user falls back to the
/// free-tier limit so stale state never grants unlimited access.
pub fn daily_limit(plan: Plan, status: SubscriptionStatus) -> i32 {
    match plan {
        Plan::Free => FREE_DAILY_LIMIT,
        Plan::Pro | Plan::ProPlus => {
            if status == SubscriptionStatus::Active {
                UNLIMITED
            } else {
                FREE_DAILY_LIMIT
            }
        }
    }
}

/// Monthly price for a paid plan in the given currency.
///
/// Returns `None` for the free tier.
pub fn plan_price(plan: Plan, currency: Currency) -> Option<f64> {
    match (plan, currency) {
        (Plan::Free, _) => None,
        (Plan::Pro, Currency::Usd) => Some(2.50),
        (Plan::Pro, Currency::Inr) => Some(199.0),
        (Plan::ProPlus, Currency::Usd) => Some(5.00),
        (Plan::ProPlus, Currency::Inr) => Some(399.0),
    }
}

/// Accepted deviation between a charged amount and the plan price,
/// absorbing payment-processor fees and rounding.
pub fn amount_tolerance(currency: Currency) -> f64 {
    match currency {
        Currency::Usd => 0.50,
        Currency::Inr => 10.0,
    }
}

/// Infer the paid plan tier from a charged amount.
///
/// Used by webhook payloads that carry an amount but no plan name.
/// Amounts below the pro price still map to pro; amount validation is a
/// separate step.
pub fn plan_from_amount(amount: f64, currency: Currency) -> Plan {
    let pro_plus = plan_price(Plan::ProPlus, currency).unwrap_or(f64::MAX);
    if amount >= pro_plus { Plan::ProPlus } else { Plan::Pro }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_serde_uses_kebab_case() {
        assert_eq!(serde_json::to_string(&Plan::ProPlus).unwrap(), "\"pro-plus\"");
        assert_eq!(
            serde_json::from_str::<Plan>("\"pro-plus\"").unwrap(),
            Plan::ProPlus
        );
    }

    #[test]
    fn status_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::PendingActivation).unwrap(),
            "\"pending_activation\""
        );
    }

    #[test]
    fn free_features_only_basic() {
        let f = FeatureFlags::for_plan(Plan::Free);
        assert!(f.basic_personas);
        assert!(!f.premium_personas);
        assert!(!f.custom_personas);
        assert!(!f.api_access);
        assert!(!f.export_data);
    }

    #[test]
    fn pro_features_no_api_access() {
        let f = FeatureFlags::for_plan(Plan::Pro);
        assert!(f.premium_personas);
        assert!(f.locked_personas);
        assert!(f.export_data);
        assert!(!f.custom_personas);
        assert!(!f.api_access);
    }

    #[test]
    fn pro_plus_features_everything() {
        let f = FeatureFlags::for_plan(Plan::ProPlus);
        assert!(f.custom_personas);
        assert!(f.api_access);
    }

    #[test]
    fn daily_limits_follow_status() {
        assert_eq!(daily_limit(Plan::Free, SubscriptionStatus::Inactive), 20);
        assert_eq!(daily_limit(Plan::Pro, SubscriptionStatus::Active), UNLIMITED);
        assert_eq!(daily_limit(Plan::Pro, SubscriptionStatus::Expired), 20);
        assert_eq!(daily_limit(Plan::ProPlus, SubscriptionStatus::PendingActivation), 20);
        assert_eq!(daily_limit(Plan::ProPlus, SubscriptionStatus::Active), UNLIMITED);
    }

    #[test]
    fn price_table() {
        assert_eq!(plan_price(Plan::Pro, Currency::Usd), Some(2.50));
        assert_eq!(plan_price(Plan::Pro, Currency::Inr), Some(199.0));
        assert_eq!(plan_price(Plan::ProPlus, Currency::Usd), Some(5.00));
        assert_eq!(plan_price(Plan::Free, Currency::Usd), None);
    }

    #[test]
    fn plan_from_amount_picks_highest_tier_reached() {
        assert_eq!(plan_from_amount(2.50, Currency::Usd), Plan::Pro);
        assert_eq!(plan_from_amount(5.00, Currency::Usd), Plan::ProPlus);
        assert_eq!(plan_from_amount(1.00, Currency::Usd), Plan::Pro);
        assert_eq!(plan_from_amount(399.0, Currency::Inr), Plan::ProPlus);
    }

    #[test]
    fn persona_gating() {
        let free = FeatureFlags::for_plan(Plan::Free);
        assert!(free.allows_persona(PersonaKind::Basic));
        assert!(!free.allows_persona(PersonaKind::Premium));
        assert!(!free.allows_persona(PersonaKind::Locked));

        let pro = FeatureFlags::for_plan(Plan::Pro);
        assert!(pro.allows_persona(PersonaKind::Premium));
        assert!(pro.allows_persona(PersonaKind::Locked));
        assert!(!pro.allows_persona(PersonaKind::Custom));

        let plus = FeatureFlags::for_plan(Plan::ProPlus);
        assert!(plus.allows_persona(PersonaKind::Custom));
    }
}

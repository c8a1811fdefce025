//! Plan catalog: the single source of truth for tier economics and
//! entitlements.
//!
//! The catalog is compiled-in configuration: there are no mutation
//! operations once it is built. [`PlanCatalog::builtin`] returns the
//! four-tier ReviewFlow table; embedders who price differently can assemble
//! their own with the builder:
//!
//! ```rust,ignore
//! use reviewflow_entitlements::{PlanCatalog, PlanKey};
//!
//! let catalog = PlanCatalog::builder()
//!     .plan(PlanKey::Free)
//!         .display_name("Free")
//!         .price("$0")
//!         .max_campaigns(1)
//!         .max_products(1)
//!         .max_reviews(10)
//!         .done()
//!     // ... one entry per PlanKey ...
//!     .build();
//! ```
//!
//! Lookup is total: every key that can appear in persisted user data
//! resolves to exactly one plan, and anything unrecognized (or absent)
//! resolves to the free plan, never to an error.

use serde::{Deserialize, Serialize};

/// The fixed set of subscription tiers.
///
/// Plans are declared cheapest first; the derived ordering follows tier
/// price, so `PlanKey::Free < PlanKey::Agency`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PlanKey {
    /// Ideal for new sellers testing the platform.
    Free,
    /// For growing sellers who need more power.
    Starter,
    /// For serious sellers and D2C brands.
    Business,
    /// For agencies managing multiple brands. Not self-service.
    Agency,
}

impl PlanKey {
    /// All keys in catalog order (cheapest first).
    pub const ALL: [PlanKey; 4] = [Self::Free, Self::Starter, Self::Business, Self::Agency];

    /// The stored string form of this key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Business => "business",
            Self::Agency => "agency",
        }
    }

    /// Parse a stored plan key.
    ///
    /// Returns `None` for anything outside the enumerated set; callers that
    /// need totality go through [`PlanCatalog::lookup`] instead.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "free" => Some(Self::Free),
            "starter" => Some(Self::Starter),
            "business" => Some(Self::Business),
            "agency" => Some(Self::Agency),
            _ => None,
        }
    }

    /// Check if this is a paid tier.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }

    /// Check if selecting this tier routes to a human-contact workflow
    /// instead of a self-service plan change.
    #[must_use]
    pub fn requires_sales_contact(&self) -> bool {
        matches!(self, Self::Agency)
    }
}

impl std::fmt::Display for PlanKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ceiling on a countable resource.
///
/// A tagged union rather than a numeric sentinel, so comparisons against
/// "no ceiling" are total and cannot be confused with arithmetic on a
/// special value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    /// No ceiling on this resource.
    #[default]
    Unbounded,
    /// At most this many.
    Bounded(u32),
}

impl Limit {
    /// Check whether a current count leaves room for one more.
    ///
    /// `Unbounded` allows every count.
    #[must_use]
    pub fn allows(&self, current: u64) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Bounded(max) => current < u64::from(*max),
        }
    }

    /// The numeric ceiling, if there is one.
    #[must_use]
    pub fn value(&self) -> Option<u32> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(max) => Some(*max),
        }
    }

    /// Check if this limit has no ceiling.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unlimited"),
            Self::Bounded(max) => write!(f, "{}", max),
        }
    }
}

/// Boolean feature gates carried by a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Reviewers must attach a screenshot of their published review.
    ScreenshotVerification,
    /// The review funnel renders under the seller's own branding.
    WhiteLabel,
}

/// Entitlement limits for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Maximum number of active campaigns.
    pub max_campaigns: Limit,
    /// Maximum number of products.
    pub max_products: Limit,
    /// Maximum reviews collected per billing period.
    pub max_reviews_per_period: Limit,
    /// Whether screenshot verification is available.
    pub screenshot_verification: bool,
    /// Whether white-label branding is available.
    pub white_label: bool,
}

impl PlanLimits {
    /// Limits with no ceilings and no feature gates.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_campaigns: Limit::Unbounded,
            max_products: Limit::Unbounded,
            max_reviews_per_period: Limit::Unbounded,
            screenshot_verification: false,
            white_label: false,
        }
    }

    /// Check a feature gate.
    #[must_use]
    pub fn has_feature(&self, feature: Feature) -> bool {
        match feature {
            Feature::ScreenshotVerification => self.screenshot_verification,
            Feature::WhiteLabel => self.white_label,
        }
    }
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// A single subscription tier: display metadata plus entitlement limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Unique key within the catalog.
    pub key: PlanKey,
    /// Display name (e.g. "Starter").
    pub display_name: String,
    /// Display price (e.g. "₹299").
    pub price: String,
    /// Billing period suffix (e.g. "/mo").
    pub billing_period: String,
    /// One-line description for the pricing page.
    pub description: String,
    /// Entitlement limits and feature gates.
    pub limits: PlanLimits,
    /// Ordered marketing feature list, display only.
    pub feature_list: Vec<String>,
    /// Highlighted on the pricing page. At most one plan should carry this.
    pub is_popular: bool,
    /// Call-to-action button label.
    pub cta_label: String,
}

impl Plan {
    /// Check a feature gate on this plan.
    #[must_use]
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.limits.has_feature(feature)
    }
}

/// An immutable, total collection of plans, exactly one per [`PlanKey`].
///
/// Deliberately not `Deserialize`: a catalog only comes out of
/// [`PlanCatalog::builtin`] or the builder, both of which uphold totality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    /// Create a builder for assembling a catalog.
    #[must_use]
    pub fn builder() -> PlanCatalogBuilder {
        PlanCatalogBuilder::new()
    }

    /// The built-in ReviewFlow four-tier catalog.
    #[must_use]
    pub fn builtin() -> Self {
        Self::builder()
            .plan(PlanKey::Free)
                .display_name("Free")
                .price("₹0")
                .billing_period("/mo")
                .description("Ideal for new sellers testing the platform.")
                .max_campaigns(1)
                .max_products(1)
                .max_reviews(10)
                .feature_list([
                    "1 active campaign",
                    "1 product",
                    "10 reviews total",
                    "Amazon SP-API connection (optional)",
                ])
                .cta_label("Current Plan")
                .done()
            .plan(PlanKey::Starter)
                .display_name("Starter")
                .price("₹299")
                .billing_period("/mo")
                .description("For growing sellers who need more power.")
                .max_campaigns(1)
                .max_products(5)
                .max_reviews(100)
                .feature_list([
                    "1 active campaign",
                    "5 products",
                    "100 reviews/month",
                    "Amazon SP-API connection (optional)",
                    "Email support",
                ])
                .cta_label("Upgrade to Starter")
                .done()
            .plan(PlanKey::Business)
                .display_name("Business")
                .price("₹499")
                .billing_period("/mo")
                .description("For serious sellers and D2C brands.")
                .max_campaigns(20)
                .max_products(100)
                .max_reviews(1000)
                .screenshot_verification(true)
                .feature_list([
                    "20 active campaigns",
                    "100 products",
                    "1000 reviews/month",
                    "Screenshot verification system",
                    "Priority email support",
                ])
                .popular()
                .cta_label("Upgrade to Business")
                .done()
            .plan(PlanKey::Agency)
                .display_name("Agency")
                .price("₹1,999+")
                .billing_period("/mo")
                .description("For agencies managing multiple brands.")
                .limits(PlanLimits {
                    max_campaigns: Limit::Unbounded,
                    max_products: Limit::Unbounded,
                    max_reviews_per_period: Limit::Unbounded,
                    screenshot_verification: true,
                    white_label: true,
                })
                .feature_list([
                    "Unlimited campaigns & products",
                    "Unlimited reviews",
                    "White-label branding option",
                    "Dedicated account manager",
                ])
                .cta_label("Contact Sales")
                .done()
            .build()
    }

    /// Look up a plan by a stored key.
    ///
    /// Total: `None`, the empty string, and anything outside the enumerated
    /// set all resolve to the free plan.
    #[must_use]
    pub fn lookup(&self, key: Option<&str>) -> &Plan {
        let key = key
            .and_then(PlanKey::parse)
            .unwrap_or(PlanKey::Free);
        self.get(key)
    }

    /// Look up a plan by typed key. Infallible, since the catalog carries one
    /// plan per key.
    #[must_use]
    pub fn get(&self, key: PlanKey) -> &Plan {
        self.plans
            .iter()
            .find(|p| p.key == key)
            .expect("catalog is total over PlanKey")
    }

    /// All plans in declaration order, for pricing-page rendering.
    #[must_use]
    pub fn all(&self) -> &[Plan] {
        &self.plans
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Builder for assembling a [`PlanCatalog`].
#[derive(Debug, Default)]
#[must_use = "builder does nothing until you call build()"]
pub struct PlanCatalogBuilder {
    plans: Vec<Plan>,
}

impl PlanCatalogBuilder {
    /// Create a new catalog builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start defining the plan for `key`. Declaration order becomes the
    /// order of [`PlanCatalog::all`].
    pub fn plan(self, key: PlanKey) -> PlanBuilder {
        PlanBuilder {
            parent: self,
            plan: Plan {
                key,
                display_name: String::new(),
                price: String::new(),
                billing_period: "/mo".to_string(),
                description: String::new(),
                limits: PlanLimits::unlimited(),
                feature_list: Vec::new(),
                is_popular: false,
                cta_label: String::new(),
            },
        }
    }

    /// Build the catalog.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one plan was defined for every [`PlanKey`];
    /// a partial catalog would break the total-lookup invariant.
    pub fn build(self) -> PlanCatalog {
        for key in PlanKey::ALL {
            let count = self.plans.iter().filter(|p| p.key == key).count();
            assert!(
                count == 1,
                "catalog must define exactly one plan for key '{}', found {}",
                key,
                count
            );
        }
        PlanCatalog { plans: self.plans }
    }

    fn add_plan(mut self, plan: Plan) -> Self {
        self.plans.push(plan);
        self
    }
}

/// Builder for a single plan entry.
#[derive(Debug)]
#[must_use = "call done() to add the plan to the catalog"]
pub struct PlanBuilder {
    parent: PlanCatalogBuilder,
    plan: Plan,
}

impl PlanBuilder {
    /// Set the display name.
    pub fn display_name(mut self, name: &str) -> Self {
        self.plan.display_name = name.to_string();
        self
    }

    /// Set the display price.
    pub fn price(mut self, price: &str) -> Self {
        self.plan.price = price.to_string();
        self
    }

    /// Set the billing period suffix.
    pub fn billing_period(mut self, period: &str) -> Self {
        self.plan.billing_period = period.to_string();
        self
    }

    /// Set the one-line description.
    pub fn description(mut self, description: &str) -> Self {
        self.plan.description = description.to_string();
        self
    }

    /// Cap the number of active campaigns.
    pub fn max_campaigns(mut self, max: u32) -> Self {
        self.plan.limits.max_campaigns = Limit::Bounded(max);
        self
    }

    /// Cap the number of products.
    pub fn max_products(mut self, max: u32) -> Self {
        self.plan.limits.max_products = Limit::Bounded(max);
        self
    }

    /// Cap the number of reviews per billing period.
    pub fn max_reviews(mut self, max: u32) -> Self {
        self.plan.limits.max_reviews_per_period = Limit::Bounded(max);
        self
    }

    /// Enable or disable screenshot verification.
    pub fn screenshot_verification(mut self, enabled: bool) -> Self {
        self.plan.limits.screenshot_verification = enabled;
        self
    }

    /// Enable or disable white-label branding.
    pub fn white_label(mut self, enabled: bool) -> Self {
        self.plan.limits.white_label = enabled;
        self
    }

    /// Set the full limits record at once.
    pub fn limits(mut self, limits: PlanLimits) -> Self {
        self.plan.limits = limits;
        self
    }

    /// Set the ordered marketing feature list.
    pub fn feature_list<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plan.feature_list = features.into_iter().map(Into::into).collect();
        self
    }

    /// Highlight this plan on the pricing page.
    pub fn popular(mut self) -> Self {
        self.plan.is_popular = true;
        self
    }

    /// Set the call-to-action label.
    pub fn cta_label(mut self, label: &str) -> Self {
        self.plan.cta_label = label.to_string();
        self
    }

    /// Finish this plan and return to the catalog builder.
    pub fn done(self) -> PlanCatalogBuilder {
        self.parent.add_plan(self.plan)
    }
}

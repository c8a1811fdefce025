//! Quota enforcement: deciding whether a resource-creation action is
//! permitted under a plan.
//!
//! [`check_quota`] is a pure function of `(plan, usage)`. It neither
//! fetches nor caches counts, so a fresh count from the usage store at
//! decision time cannot be masked by staleness here. [`CreationGate`] wires
//! the pure check to a resolver and a usage store for callers that want the
//! whole decision in one call:
//!
//! ```rust,ignore
//! use reviewflow_entitlements::{CreationGate, QuotaDecision, Resource};
//!
//! let gate = CreationGate::new(resolver, usage_store);
//!
//! match gate.authorize(user_id, Resource::Campaign).await? {
//!     QuotaDecision::Allowed => { /* create the campaign */ }
//!     denied => return Err(ApiError::upgrade_required(denied.upgrade_prompt())),
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audit::{NoOpAuditLogger, PlanAuditEvent, PlanAuditLogger};
use crate::catalog::{Feature, Limit, Plan, PlanLimits};
use crate::error::Result;
use crate::resolver::PlanResolver;
use crate::store::{PlanKeyStore, UsageStore};
use crate::validation::validate_user_id;

/// A countable resource governed by plan limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Review-collection campaigns.
    Campaign,
    /// Products attached to campaigns.
    Product,
    /// Reviews collected in the current billing period.
    Review,
}

impl Resource {
    /// Singular noun for user-facing messages.
    #[must_use]
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Campaign => "campaign",
            Self::Product => "product",
            Self::Review => "review",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.noun())
    }
}

impl PlanLimits {
    /// The limit governing a resource.
    #[must_use]
    pub fn limit_for(&self, resource: Resource) -> Limit {
        match resource {
            Resource::Campaign => self.max_campaigns,
            Resource::Product => self.max_products,
            Resource::Review => self.max_reviews_per_period,
        }
    }
}

/// Outcome of a quota check.
///
/// `Denied` is a normal result, not an error; it carries what the caller
/// needs to render an upgrade prompt referencing the exact ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum QuotaDecision {
    /// The creation may proceed.
    Allowed,
    /// The plan's ceiling for this resource has been reached.
    Denied {
        /// The resource that hit its ceiling.
        resource: Resource,
        /// The numeric ceiling.
        limit: u32,
        /// Display name of the plan the ceiling belongs to.
        plan_name: String,
    },
}

impl QuotaDecision {
    /// Check if the creation may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Check if the ceiling was reached.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }

    /// The upgrade call-to-action for a denied decision.
    #[must_use]
    pub fn upgrade_prompt(&self) -> Option<String> {
        match self {
            Self::Allowed => None,
            Self::Denied {
                resource,
                limit,
                plan_name,
            } => Some(format!(
                "You have reached the limit of {} {}(s) for the {} plan. Please upgrade to create more.",
                limit,
                resource.noun(),
                plan_name
            )),
        }
    }
}

/// Decide whether creating one more `resource` is permitted under `plan`.
///
/// `current_count` must be a fresh count from external storage at decision
/// time; this function never fetches or caches it.
#[must_use]
pub fn check_quota(resource: Resource, current_count: u64, plan: &Plan) -> QuotaDecision {
    match plan.limits.limit_for(resource) {
        Limit::Unbounded => QuotaDecision::Allowed,
        Limit::Bounded(limit) => {
            if current_count >= u64::from(limit) {
                QuotaDecision::Denied {
                    resource,
                    limit,
                    plan_name: plan.display_name.clone(),
                }
            } else {
                QuotaDecision::Allowed
            }
        }
    }
}

/// Gate for resource-creation paths: resolve the plan, fetch a fresh count,
/// check the quota.
///
/// Every creation path goes through the same gate, so limit-lookup logic
/// lives in exactly one place.
pub struct CreationGate<S, U> {
    resolver: PlanResolver<S>,
    usage: U,
    audit: Arc<dyn PlanAuditLogger>,
}

impl<S: PlanKeyStore, U: UsageStore> CreationGate<S, U> {
    /// Create a new gate.
    #[must_use]
    pub fn new(resolver: PlanResolver<S>, usage: U) -> Self {
        Self {
            resolver,
            usage,
            audit: Arc::new(NoOpAuditLogger),
        }
    }

    /// Attach an audit logger for denied decisions.
    #[must_use]
    pub fn with_audit_logger(mut self, audit: Arc<dyn PlanAuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Authorize creating one more `resource` for `user_id`.
    ///
    /// The usage count is read fresh on every call; a usage-store failure is
    /// surfaced verbatim rather than guessed around.
    pub async fn authorize(&self, user_id: &str, resource: Resource) -> Result<QuotaDecision> {
        validate_user_id(user_id)?;

        let plan = self.resolver.resolve(Some(user_id)).await;
        let current = self.usage.count(user_id, resource).await?;
        let decision = check_quota(resource, current, &plan);

        if let QuotaDecision::Denied { limit, .. } = &decision {
            tracing::info!(
                target: "reviewflow::quota",
                user_id = %user_id,
                resource = %resource,
                current = current,
                limit = limit,
                plan = %plan.key,
                "creation denied by plan limit"
            );
            self.audit
                .record(PlanAuditEvent::QuotaDenied {
                    user_id: user_id.to_string(),
                    resource,
                    limit: *limit,
                    plan: plan.key,
                })
                .await;
        }

        Ok(decision)
    }

    /// Check a boolean feature gate for a (possibly anonymous) caller.
    pub async fn has_feature(&self, user_id: Option<&str>, feature: Feature) -> bool {
        self.resolver.resolve(user_id).await.has_feature(feature)
    }

    /// The underlying resolver, for plan display and mutations.
    #[must_use]
    pub fn resolver(&self) -> &PlanResolver<S> {
        &self.resolver
    }
}

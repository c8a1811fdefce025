//! ReviewFlow entitlements: plan catalog, entitlement resolution, and
//! quota enforcement for the review-collection platform.
//!
//! Every gating decision in the product goes through this crate: campaign
//! and product creation, review ingestion, and the screenshot-verification
//! and white-label feature gates. The pieces:
//!
//! - **Plan catalog**: the compiled-in, total table of tiers and their
//!   limits ([`PlanCatalog`]).
//! - **Entitlement resolver**: maps a user identity to their current plan,
//!   with a time-bounded cache and safe free-plan defaults
//!   ([`PlanResolver`]).
//! - **Quota enforcement**: a pure check of live usage against a plan limit
//!   ([`check_quota`]), plus a [`CreationGate`] that composes the resolver
//!   with a fresh usage read.
//! - **Agency contact**: the human-contact workflow for the tier that is
//!   not self-service ([`AgencyContact`]).
//!
//! Storage is pluggable: implement [`PlanKeyStore`] and [`UsageStore`]
//! against your hosted backend.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use reviewflow_entitlements::{
//!     CreationGate, PlanCatalog, PlanKey, PlanResolver, QuotaDecision, Resource,
//! };
//!
//! reviewflow_entitlements::init_tracing();
//!
//! let resolver = PlanResolver::new(plan_store, PlanCatalog::builtin());
//! let gate = CreationGate::new(resolver, usage_store);
//!
//! match gate.authorize(&user.id, Resource::Campaign).await? {
//!     QuotaDecision::Allowed => create_campaign().await?,
//!     denied => show_upgrade_prompt(denied.upgrade_prompt()),
//! }
//! ```

pub mod audit;
pub mod catalog;
pub mod config;
mod error;
pub mod inquiry;
pub mod quota;
pub mod resolver;
pub mod store;
pub mod validation;

// Catalog exports
pub use catalog::{
    Feature, Limit, Plan, PlanBuilder, PlanCatalog, PlanCatalogBuilder, PlanKey, PlanLimits,
};

// Resolver exports
pub use config::{PaidDowngradePolicy, ResolverConfig, ResolverConfigBuilder};
pub use resolver::PlanResolver;

// Quota exports
pub use quota::{check_quota, CreationGate, QuotaDecision, Resource};

// Storage exports
pub use store::{PlanKeyStore, UsageStore};

// Inquiry exports
pub use inquiry::{
    AgencyContact, AgencyInquiry, InquiryChannel, InquiryReceipt, INQUIRY_CONFIRMATION,
};

// Audit exports
pub use audit::{NoOpAuditLogger, PlanAuditEvent, PlanAuditLogger, TracingAuditLogger};

// Error exports
pub use error::{Error, Result};

// Test exports
#[cfg(any(test, feature = "test-support"))]
pub use store::test::{
    FailingPlanStore, FailingUsageStore, InMemoryPlanStore, InMemoryUsageStore,
};

#[cfg(any(test, feature = "test-support"))]
pub use inquiry::test::{FailingInquiryChannel, RecordingInquiryChannel};

#[cfg(any(test, feature = "test-support"))]
pub use audit::test::RecordingAuditLogger;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging with sensible defaults.
///
/// Call this early in your application, before constructing resolvers.
///
/// # Environment Variables
///
/// - `RUST_LOG`: set the log level (e.g. "info", "reviewflow=debug")
/// - `REVIEWFLOW_LOG_JSON`: set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("REVIEWFLOW_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

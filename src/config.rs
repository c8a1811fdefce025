//! Resolver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Policy for downgrades between paid tiers (e.g. business → starter).
///
/// Downgrading to the free plan is always rejected; whether a paid tier may
/// move to a cheaper paid tier is a product decision, so it is configurable
/// rather than hard-coded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaidDowngradePolicy {
    /// Any paid tier may move to any other paid tier.
    #[default]
    Allow,
    /// Paid tiers may only move upward.
    Deny,
}

/// Configuration for [`crate::resolver::PlanResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Freshness window for cached resolutions.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: Duration,
    /// Maximum number of cached resolutions before the least recently used
    /// entries are evicted.
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,
    /// Policy for downgrades between paid tiers.
    #[serde(default)]
    pub paid_downgrade: PaidDowngradePolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: default_cache_ttl(),
            max_cache_entries: default_max_cache_entries(),
            paid_downgrade: PaidDowngradePolicy::default(),
        }
    }
}

impl ResolverConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> ResolverConfigBuilder {
        ResolverConfigBuilder::new()
    }
}

fn default_cache_ttl() -> Duration {
    // Matches the dashboard's five-minute stale window.
    Duration::from_secs(5 * 60)
}

fn default_max_cache_entries() -> usize {
    10_000
}

/// Builder for [`ResolverConfig`].
#[derive(Debug, Default)]
#[must_use = "builder does nothing until you call build()"]
pub struct ResolverConfigBuilder {
    config: ResolverConfig,
}

impl ResolverConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ResolverConfig::default(),
        }
    }

    /// Set the cache freshness window.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    /// Set the maximum number of cached resolutions.
    pub fn max_cache_entries(mut self, max: usize) -> Self {
        self.config.max_cache_entries = max;
        self
    }

    /// Set the paid-tier downgrade policy.
    pub fn paid_downgrade(mut self, policy: PaidDowngradePolicy) -> Self {
        self.config.paid_downgrade = policy;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ResolverConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.max_cache_entries, 10_000);
        assert_eq!(config.paid_downgrade, PaidDowngradePolicy::Allow);
    }

    #[test]
    fn test_builder() {
        let config = ResolverConfig::builder()
            .cache_ttl(Duration::from_secs(30))
            .max_cache_entries(100)
            .paid_downgrade(PaidDowngradePolicy::Deny)
            .build();

        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.max_cache_entries, 100);
        assert_eq!(config.paid_downgrade, PaidDowngradePolicy::Deny);
    }

    #[test]
    fn test_deserializes_with_partial_fields() {
        let config: ResolverConfig = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(config, ResolverConfig::default());

        let config: ResolverConfig =
            serde_json::from_str(r#"{"paid_downgrade": "deny"}"#).unwrap();
        assert_eq!(config.paid_downgrade, PaidDowngradePolicy::Deny);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
    }
}

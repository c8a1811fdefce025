//! Entitlement resolution: mapping a user identity to their current plan.
//!
//! Resolution is total and infallible: an anonymous caller, a missing
//! assignment, a store failure, or a stale key all resolve to the free plan.
//! Failures degrade silently (logged and audited) rather than surfacing, so
//! gating decisions never have an error path of their own.
//!
//! Resolutions are cached per user with a time-bounded freshness window; a
//! successful plan change invalidates the entry before the mutation is
//! reported successful, so the next check observes the new limits without
//! waiting for expiry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::audit::{NoOpAuditLogger, PlanAuditEvent, PlanAuditLogger};
use crate::catalog::{Plan, PlanCatalog, PlanKey};
use crate::config::{PaidDowngradePolicy, ResolverConfig};
use crate::error::{Error, Result};
use crate::store::PlanKeyStore;
use crate::validation::validate_user_id;

/// Cleanup interval (every N cache operations).
const CLEANUP_INTERVAL: u64 = 100;

/// Resolves user identities to plans, with caching and safe defaults.
pub struct PlanResolver<S> {
    store: S,
    catalog: PlanCatalog,
    config: ResolverConfig,
    cache: RwLock<ResolutionCache>,
    operation_counter: AtomicU64,
    audit: Arc<dyn PlanAuditLogger>,
}

#[derive(Default)]
struct ResolutionCache {
    entries: HashMap<String, CacheEntry>,
}

struct CacheEntry {
    key: PlanKey,
    expires_at: Instant,
    last_accessed: Instant,
}

impl<S: PlanKeyStore> PlanResolver<S> {
    /// Create a resolver with the default configuration.
    #[must_use]
    pub fn new(store: S, catalog: PlanCatalog) -> Self {
        Self::with_config(store, catalog, ResolverConfig::default())
    }

    /// Create a resolver with an explicit configuration.
    #[must_use]
    pub fn with_config(store: S, catalog: PlanCatalog, config: ResolverConfig) -> Self {
        Self {
            store,
            catalog,
            config,
            cache: RwLock::new(ResolutionCache::default()),
            operation_counter: AtomicU64::new(0),
            audit: Arc::new(NoOpAuditLogger),
        }
    }

    /// Attach an audit logger for plan changes and degradations.
    #[must_use]
    pub fn with_audit_logger(mut self, audit: Arc<dyn PlanAuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// The catalog this resolver serves plans from.
    #[must_use]
    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// Resolve a user to their current plan.
    ///
    /// - `None` (not authenticated) resolves to the free plan with no
    ///   external call.
    /// - A store failure or an unrecognized stored key resolves to the free
    ///   plan; the degradation is logged and audited, never returned.
    pub async fn resolve(&self, user_id: Option<&str>) -> Plan {
        let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
            return self.catalog.get(PlanKey::Free).clone();
        };

        self.maybe_cleanup();

        if let Some(key) = self.cached_key(user_id) {
            return self.catalog.get(key).clone();
        }

        let key = self.fetch_key(user_id).await;
        self.cache_key(user_id, key);
        self.catalog.get(key).clone()
    }

    /// Change a user's stored plan.
    ///
    /// Disallowed transitions are rejected before any store write:
    ///
    /// - paid → free is never permitted ([`Error::DowngradeNotPermitted`]);
    /// - paid → cheaper paid is rejected under
    ///   [`PaidDowngradePolicy::Deny`];
    /// - the agency tier is not self-service
    ///   ([`Error::SalesContactRequired`]); route those callers to the
    ///   inquiry channel instead.
    ///
    /// On success the cached resolution is invalidated before returning, so
    /// a subsequent [`resolve`](Self::resolve) observes the new plan. Store
    /// failures are surfaced verbatim.
    pub async fn update_plan(&self, user_id: &str, new_key: PlanKey) -> Result<()> {
        validate_user_id(user_id)?;

        if new_key.requires_sales_contact() {
            self.reject(user_id, new_key, "agency tier requires sales contact")
                .await;
            return Err(Error::SalesContactRequired);
        }

        let current = self.resolve(Some(user_id)).await.key;

        if current == new_key {
            // Re-selecting the current plan is a no-op, not an error.
            return Ok(());
        }

        if new_key == PlanKey::Free && current.is_paid() {
            self.reject(user_id, new_key, "downgrade to free is not permitted")
                .await;
            return Err(Error::DowngradeNotPermitted { from: current });
        }

        if self.config.paid_downgrade == PaidDowngradePolicy::Deny
            && current.is_paid()
            && new_key.is_paid()
            && new_key < current
        {
            self.reject(user_id, new_key, "paid downgrades are disabled")
                .await;
            return Err(Error::PaidDowngradeDenied {
                from: current,
                to: new_key,
            });
        }

        self.store.set_plan_key(user_id, new_key.as_str()).await?;

        // Invalidate before reporting success so the next resolution within
        // the same logical session observes the new plan.
        self.invalidate(user_id);

        tracing::info!(
            target: "reviewflow::resolver",
            user_id = %user_id,
            from = %current,
            to = %new_key,
            "plan updated"
        );
        self.audit
            .record(PlanAuditEvent::PlanChanged {
                user_id: user_id.to_string(),
                from: current,
                to: new_key,
            })
            .await;

        Ok(())
    }

    /// Drop the cached resolution for one user.
    pub fn invalidate(&self, user_id: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.entries.remove(user_id);
        } else {
            tracing::warn!(
                target: "reviewflow::resolver",
                user_id = %user_id,
                "resolution cache lock poisoned during invalidate"
            );
        }
    }

    /// Drop every cached resolution.
    pub fn clear_cache(&self) {
        match self.cache.write() {
            Ok(mut cache) => cache.entries.clear(),
            Err(poisoned) => {
                tracing::warn!(
                    target: "reviewflow::resolver",
                    "resolution cache lock poisoned, clearing and recovering"
                );
                poisoned.into_inner().entries.clear();
            }
        }
    }

    /// Number of cached resolutions.
    #[must_use]
    pub fn cache_size(&self) -> usize {
        self.cache.read().map(|c| c.entries.len()).unwrap_or(0)
    }

    /// Remove expired cache entries.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        if let Ok(mut cache) = self.cache.write() {
            cache.entries.retain(|_, entry| entry.expires_at > now);
        }
    }

    /// Evict least recently used entries above the configured maximum.
    pub fn enforce_max_entries(&self) {
        if let Ok(mut cache) = self.cache.write() {
            if cache.entries.len() <= self.config.max_cache_entries {
                return;
            }

            let mut entries: Vec<_> = cache
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.last_accessed))
                .collect();
            entries.sort_by_key(|(_, accessed)| *accessed);

            let to_remove = cache.entries.len() - self.config.max_cache_entries;
            for (key, _) in entries.into_iter().take(to_remove) {
                cache.entries.remove(&key);
            }
        }
    }

    async fn fetch_key(&self, user_id: &str) -> PlanKey {
        match self.store.get_plan_key(user_id).await {
            Ok(Some(raw)) => match PlanKey::parse(&raw) {
                Some(key) => key,
                None => {
                    self.degrade(user_id, format!("unrecognized stored plan key '{}'", raw))
                        .await;
                    PlanKey::Free
                }
            },
            // No assignment yet: implicit signup state, not a degradation.
            Ok(None) => PlanKey::Free,
            Err(err) => {
                self.degrade(user_id, format!("plan lookup failed: {}", err))
                    .await;
                PlanKey::Free
            }
        }
    }

    async fn degrade(&self, user_id: &str, reason: String) {
        tracing::warn!(
            target: "reviewflow::resolver",
            user_id = %user_id,
            reason = %reason,
            "plan resolution degraded to free"
        );
        self.audit
            .record(PlanAuditEvent::ResolutionDegraded {
                user_id: user_id.to_string(),
                reason,
            })
            .await;
    }

    async fn reject(&self, user_id: &str, requested: PlanKey, reason: &str) {
        self.audit
            .record(PlanAuditEvent::PlanChangeRejected {
                user_id: user_id.to_string(),
                requested,
                reason: reason.to_string(),
            })
            .await;
    }

    fn cached_key(&self, user_id: &str) -> Option<PlanKey> {
        let mut cache = self.cache.write().ok()?;
        let entry = cache.entries.get_mut(user_id)?;
        if entry.expires_at > Instant::now() {
            entry.last_accessed = Instant::now();
            Some(entry.key)
        } else {
            None
        }
    }

    fn cache_key(&self, user_id: &str, key: PlanKey) {
        let now = Instant::now();
        if let Ok(mut cache) = self.cache.write() {
            cache.entries.insert(
                user_id.to_string(),
                CacheEntry {
                    key,
                    expires_at: now + self.config.cache_ttl,
                    last_accessed: now,
                },
            );
        } else {
            tracing::warn!(
                target: "reviewflow::resolver",
                "resolution cache lock poisoned, skipping cache update"
            );
        }
    }

    fn maybe_cleanup(&self) {
        let count = self.operation_counter.fetch_add(1, Ordering::Relaxed);
        if count % CLEANUP_INTERVAL == 0 {
            self.cleanup_expired();
            self.enforce_max_entries();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::test::RecordingAuditLogger;
    use crate::store::test::{FailingPlanStore, InMemoryPlanStore};
    use std::time::Duration;

    fn resolver(store: InMemoryPlanStore) -> PlanResolver<InMemoryPlanStore> {
        PlanResolver::new(store, PlanCatalog::builtin())
    }

    #[tokio::test]
    async fn test_anonymous_resolves_to_free_without_store_call() {
        let store = InMemoryPlanStore::new();
        let resolver = resolver(store.clone());

        let plan = resolver.resolve(None).await;
        assert_eq!(plan.key, PlanKey::Free);
        assert_eq!(store.reads(), 0);

        // Empty ids are treated as anonymous, too.
        let plan = resolver.resolve(Some("")).await;
        assert_eq!(plan.key, PlanKey::Free);
        assert_eq!(store.reads(), 0);
    }

    #[tokio::test]
    async fn test_resolve_stored_plan() {
        let store = InMemoryPlanStore::new();
        store.seed("seller_1", "business");
        let resolver = resolver(store);

        let plan = resolver.resolve(Some("seller_1")).await;
        assert_eq!(plan.key, PlanKey::Business);
        assert_eq!(plan.display_name, "Business");
    }

    #[tokio::test]
    async fn test_missing_assignment_resolves_to_free() {
        let resolver = resolver(InMemoryPlanStore::new());
        let plan = resolver.resolve(Some("never_seen")).await;
        assert_eq!(plan.key, PlanKey::Free);
    }

    #[tokio::test]
    async fn test_unrecognized_key_degrades_to_free() {
        let store = InMemoryPlanStore::new();
        store.seed("seller_2", "legacy_gold");

        let audit = RecordingAuditLogger::new();
        let resolver = PlanResolver::new(store, PlanCatalog::builtin())
            .with_audit_logger(Arc::new(audit.clone()));

        let plan = resolver.resolve(Some("seller_2")).await;
        assert_eq!(plan.key, PlanKey::Free);

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            PlanAuditEvent::ResolutionDegraded { user_id, .. } if user_id == "seller_2"
        ));
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_free() {
        let audit = RecordingAuditLogger::new();
        let resolver = PlanResolver::new(FailingPlanStore, PlanCatalog::builtin())
            .with_audit_logger(Arc::new(audit.clone()));

        let plan = resolver.resolve(Some("seller_3")).await;
        assert_eq!(plan.key, PlanKey::Free);
        assert_eq!(audit.events().len(), 1);
    }

    #[tokio::test]
    async fn test_resolution_is_cached() {
        let store = InMemoryPlanStore::new();
        store.seed("seller_4", "starter");
        let resolver = resolver(store.clone());

        let _ = resolver.resolve(Some("seller_4")).await;
        let _ = resolver.resolve(Some("seller_4")).await;
        let _ = resolver.resolve(Some("seller_4")).await;

        assert_eq!(store.reads(), 1);
        assert_eq!(resolver.cache_size(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let store = InMemoryPlanStore::new();
        store.seed("seller_5", "starter");
        let config = ResolverConfig::builder()
            .cache_ttl(Duration::ZERO)
            .build();
        let resolver = PlanResolver::with_config(store.clone(), PlanCatalog::builtin(), config);

        let _ = resolver.resolve(Some("seller_5")).await;
        let _ = resolver.resolve(Some("seller_5")).await;

        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let store = InMemoryPlanStore::new();
        store.seed("seller_6", "starter");
        let resolver = resolver(store.clone());

        let _ = resolver.resolve(Some("seller_6")).await;
        resolver.invalidate("seller_6");
        let _ = resolver.resolve(Some("seller_6")).await;

        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_update_plan_persists_and_invalidates() {
        let store = InMemoryPlanStore::new();
        let audit = RecordingAuditLogger::new();
        let resolver = PlanResolver::new(store.clone(), PlanCatalog::builtin())
            .with_audit_logger(Arc::new(audit.clone()));

        // Prime the cache with the free plan.
        assert_eq!(resolver.resolve(Some("seller_7")).await.key, PlanKey::Free);

        resolver
            .update_plan("seller_7", PlanKey::Starter)
            .await
            .unwrap();

        // The very next resolution reflects the change, despite the earlier
        // cached entry.
        assert_eq!(
            resolver.resolve(Some("seller_7")).await.key,
            PlanKey::Starter
        );
        assert_eq!(store.stored_key("seller_7"), Some("starter".to_string()));
        assert!(audit
            .events()
            .iter()
            .any(|e| matches!(e, PlanAuditEvent::PlanChanged { to: PlanKey::Starter, .. })));
    }

    #[tokio::test]
    async fn test_downgrade_to_free_is_rejected_for_every_paid_plan() {
        for paid in [PlanKey::Starter, PlanKey::Business, PlanKey::Agency] {
            let store = InMemoryPlanStore::new();
            store.seed("seller_8", paid.as_str());
            let resolver = resolver(store.clone());

            let err = resolver
                .update_plan("seller_8", PlanKey::Free)
                .await
                .unwrap_err();
            assert!(
                matches!(err, Error::DowngradeNotPermitted { from } if from == paid),
                "downgrade from {} should be rejected",
                paid
            );
            // Rejected before any store write.
            assert_eq!(store.writes(), 0);
            assert_eq!(store.stored_key("seller_8"), Some(paid.as_str().to_string()));
        }
    }

    #[tokio::test]
    async fn test_update_to_free_when_already_free_is_noop() {
        let store = InMemoryPlanStore::new();
        let resolver = resolver(store.clone());

        resolver.update_plan("seller_9", PlanKey::Free).await.unwrap();
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_reselecting_current_plan_is_noop() {
        let store = InMemoryPlanStore::new();
        store.seed("seller_10", "business");
        let resolver = resolver(store.clone());

        resolver
            .update_plan("seller_10", PlanKey::Business)
            .await
            .unwrap();
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_agency_is_not_self_service() {
        let store = InMemoryPlanStore::new();
        store.seed("seller_11", "business");
        let audit = RecordingAuditLogger::new();
        let resolver = PlanResolver::new(store.clone(), PlanCatalog::builtin())
            .with_audit_logger(Arc::new(audit.clone()));

        let err = resolver
            .update_plan("seller_11", PlanKey::Agency)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SalesContactRequired));
        assert_eq!(store.writes(), 0);
        assert!(audit
            .events()
            .iter()
            .any(|e| matches!(e, PlanAuditEvent::PlanChangeRejected { .. })));
    }

    #[tokio::test]
    async fn test_paid_downgrade_allowed_by_default() {
        let store = InMemoryPlanStore::new();
        store.seed("seller_12", "business");
        let resolver = resolver(store.clone());

        resolver
            .update_plan("seller_12", PlanKey::Starter)
            .await
            .unwrap();
        assert_eq!(store.stored_key("seller_12"), Some("starter".to_string()));
    }

    #[tokio::test]
    async fn test_paid_downgrade_denied_under_deny_policy() {
        let store = InMemoryPlanStore::new();
        store.seed("seller_13", "business");
        let config = ResolverConfig::builder()
            .paid_downgrade(PaidDowngradePolicy::Deny)
            .build();
        let resolver = PlanResolver::with_config(store.clone(), PlanCatalog::builtin(), config);

        let err = resolver
            .update_plan("seller_13", PlanKey::Starter)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PaidDowngradeDenied {
                from: PlanKey::Business,
                to: PlanKey::Starter,
            }
        ));
        assert_eq!(store.writes(), 0);

        // Upgrades still go through under the same policy.
        resolver.invalidate("seller_13");
        store.seed("seller_13", "starter");
        resolver
            .update_plan("seller_13", PlanKey::Business)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_plan_surfaces_store_failure() {
        let resolver = PlanResolver::new(FailingPlanStore, PlanCatalog::builtin());

        let err = resolver
            .update_plan("seller_14", PlanKey::Starter)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_update_plan_rejects_invalid_user_id() {
        let resolver = resolver(InMemoryPlanStore::new());

        let err = resolver.update_plan("", PlanKey::Starter).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUserId { .. }));
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let store = InMemoryPlanStore::new();
        store.seed("a", "starter");
        store.seed("b", "business");
        let resolver = resolver(store);

        let _ = resolver.resolve(Some("a")).await;
        let _ = resolver.resolve(Some("b")).await;
        assert_eq!(resolver.cache_size(), 2);

        resolver.clear_cache();
        assert_eq!(resolver.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_max_entries_eviction() {
        let store = InMemoryPlanStore::new();
        let config = ResolverConfig::builder().max_cache_entries(3).build();
        let resolver = PlanResolver::with_config(store, PlanCatalog::builtin(), config);

        for i in 0..5 {
            let _ = resolver.resolve(Some(&format!("user_{}", i))).await;
        }

        resolver.enforce_max_entries();
        assert!(resolver.cache_size() <= 3);
    }
}

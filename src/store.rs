//! Storage traits for externally held plan assignments and usage counts.
//!
//! The crate never talks to a database directly; implement these traits
//! against your hosted backend. In-memory implementations are provided for
//! testing under [`test`].

use async_trait::async_trait;

use crate::error::Result;
use crate::quota::Resource;

/// Trait for the external user store holding one plan key per user.
///
/// A read immediately after a write by the same caller is expected to
/// reflect the write (read-your-write); the resolver's cache invalidation
/// relies on it.
#[async_trait]
pub trait PlanKeyStore: Send + Sync {
    /// Get the stored plan key for a user, or `None` if the user has never
    /// selected a plan (absence means free).
    async fn get_plan_key(&self, user_id: &str) -> Result<Option<String>>;

    /// Persist a plan key for a user.
    async fn set_plan_key(&self, user_id: &str, plan_key: &str) -> Result<()>;
}

/// Trait for the external usage store exposing live resource counts.
///
/// Counts are consumed at decision time only; this crate never caches them.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Count the user's existing resources of one kind.
    async fn count(&self, user_id: &str, resource: Resource) -> Result<u64>;
}

/// In-memory stores for testing.
#[cfg(any(test, feature = "test-support"))]
pub mod test {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, RwLock};

    /// In-memory plan-key store that counts reads and writes.
    ///
    /// Wraps data in `Arc` for cheap cloning. The call counters let tests
    /// assert that resolution hit (or skipped) the store.
    #[derive(Default, Clone)]
    pub struct InMemoryPlanStore {
        inner: Arc<InMemoryPlanStoreInner>,
    }

    #[derive(Default)]
    struct InMemoryPlanStoreInner {
        keys: RwLock<HashMap<String, String>>,
        reads: AtomicUsize,
        writes: AtomicUsize,
    }

    impl InMemoryPlanStore {
        /// Create a new empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a stored plan key without counting it as a write.
        ///
        /// The key is stored raw, so tests can seed stale or corrupt values
        /// that no longer parse.
        pub fn seed(&self, user_id: &str, plan_key: &str) {
            self.inner
                .keys
                .write()
                .unwrap()
                .insert(user_id.to_string(), plan_key.to_string());
        }

        /// Number of `get_plan_key` calls made so far.
        #[must_use]
        pub fn reads(&self) -> usize {
            self.inner.reads.load(Ordering::SeqCst)
        }

        /// Number of `set_plan_key` calls made so far.
        #[must_use]
        pub fn writes(&self) -> usize {
            self.inner.writes.load(Ordering::SeqCst)
        }

        /// The raw stored key for a user, if any.
        #[must_use]
        pub fn stored_key(&self, user_id: &str) -> Option<String> {
            self.inner.keys.read().unwrap().get(user_id).cloned()
        }
    }

    #[async_trait]
    impl PlanKeyStore for InMemoryPlanStore {
        async fn get_plan_key(&self, user_id: &str) -> Result<Option<String>> {
            self.inner.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.inner.keys.read().unwrap().get(user_id).cloned())
        }

        async fn set_plan_key(&self, user_id: &str, plan_key: &str) -> Result<()> {
            self.inner.writes.fetch_add(1, Ordering::SeqCst);
            self.inner
                .keys
                .write()
                .unwrap()
                .insert(user_id.to_string(), plan_key.to_string());
            Ok(())
        }
    }

    /// Plan-key store whose every call fails, for degradation tests.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FailingPlanStore;

    #[async_trait]
    impl PlanKeyStore for FailingPlanStore {
        async fn get_plan_key(&self, _user_id: &str) -> Result<Option<String>> {
            Err(anyhow::anyhow!("plan store unavailable").into())
        }

        async fn set_plan_key(&self, _user_id: &str, _plan_key: &str) -> Result<()> {
            Err(anyhow::anyhow!("plan store unavailable").into())
        }
    }

    /// In-memory usage store with settable counts.
    #[derive(Default, Clone)]
    pub struct InMemoryUsageStore {
        counts: Arc<RwLock<HashMap<(String, Resource), u64>>>,
    }

    impl InMemoryUsageStore {
        /// Create a new empty store. Missing entries count as zero.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Set the live count for a user and resource.
        pub fn set_count(&self, user_id: &str, resource: Resource, count: u64) {
            self.counts
                .write()
                .unwrap()
                .insert((user_id.to_string(), resource), count);
        }
    }

    #[async_trait]
    impl UsageStore for InMemoryUsageStore {
        async fn count(&self, user_id: &str, resource: Resource) -> Result<u64> {
            Ok(self
                .counts
                .read()
                .unwrap()
                .get(&(user_id.to_string(), resource))
                .copied()
                .unwrap_or(0))
        }
    }

    /// Usage store whose every call fails.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FailingUsageStore;

    #[async_trait]
    impl UsageStore for FailingUsageStore {
        async fn count(&self, _user_id: &str, _resource: Resource) -> Result<u64> {
            Err(anyhow::anyhow!("usage store unavailable").into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test::{FailingPlanStore, InMemoryPlanStore, InMemoryUsageStore};
    use super::*;

    #[tokio::test]
    async fn test_in_memory_plan_store() {
        let store = InMemoryPlanStore::new();

        assert_eq!(store.get_plan_key("u1").await.unwrap(), None);
        store.set_plan_key("u1", "starter").await.unwrap();
        assert_eq!(
            store.get_plan_key("u1").await.unwrap(),
            Some("starter".to_string())
        );

        assert_eq!(store.reads(), 2);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_seed_does_not_count_as_write() {
        let store = InMemoryPlanStore::new();
        store.seed("u1", "legacy_gold");

        assert_eq!(store.writes(), 0);
        assert_eq!(
            store.get_plan_key("u1").await.unwrap(),
            Some("legacy_gold".to_string())
        );
    }

    #[tokio::test]
    async fn test_failing_plan_store() {
        let store = FailingPlanStore;
        assert!(store.get_plan_key("u1").await.is_err());
        assert!(store.set_plan_key("u1", "starter").await.is_err());
    }

    #[tokio::test]
    async fn test_in_memory_usage_store_defaults_to_zero() {
        let usage = InMemoryUsageStore::new();
        assert_eq!(usage.count("u1", Resource::Campaign).await.unwrap(), 0);

        usage.set_count("u1", Resource::Campaign, 3);
        assert_eq!(usage.count("u1", Resource::Campaign).await.unwrap(), 3);
        // Other resources are unaffected.
        assert_eq!(usage.count("u1", Resource::Product).await.unwrap(), 0);
    }
}

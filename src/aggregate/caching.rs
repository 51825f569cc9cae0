//! Caching Aggregation Decorator
//!
//! Wraps any [`TenantAdapter`] with a [`TenantCacheStore`] and decides per
//! call whether to serve from cache or refresh. Implements the same
//! capability interface as the wrapped adapter so it composes transparently
//! with the multi-source fan-out and the statistics decorator.

use crate::cache::meta::{CacheMeta, CollectionStamp};
use crate::cache::store::TenantCacheStore;
use crate::domain::ports::{DateRange, TenantAdapter, TenantAdapterRef};
use crate::domain::tenant::{CostEntry, Tenant};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info};

/// Cache-or-refresh decorator over a tenant adapter
///
/// Data categories age independently: inventory and IAM by the store's
/// eviction delay, costs by exact date-range match. On every refresh the
/// tenants are persisted before the corresponding metadata stamp is
/// advanced, so a failed persist never reports false freshness.
pub struct CachingTenantAdapter {
    inner: TenantAdapterRef,
    store: TenantCacheStore,
}

impl CachingTenantAdapter {
    pub fn new(inner: TenantAdapterRef, store: TenantCacheStore) -> Self {
        Self { inner, store }
    }

    pub fn store(&self) -> &TenantCacheStore {
        &self.store
    }
}

#[async_trait]
impl TenantAdapter for CachingTenantAdapter {
    async fn get_tenants(&self) -> Result<Vec<Tenant>> {
        if self.store.is_inventory_fresh().await? {
            debug!("Inventory cache hit, serving tenants from store");
            return self.store.load().await;
        }

        debug!("Inventory cache miss, refreshing from source");
        let mut fresh = self.inner.get_tenants().await?;

        // Inventory pulls carry no cost data. Splice previously collected
        // cost history into the fresh records so it survives the refresh.
        let cached = self.store.load().await?;
        let mut cost_history: HashMap<String, Vec<CostEntry>> = cached
            .into_iter()
            .map(|t| (t.platform_tenant_id, t.costs))
            .collect();
        for tenant in &mut fresh {
            if let Some(history) = cost_history.remove(&tenant.platform_tenant_id) {
                tenant.costs.extend(history);
            }
        }

        for tenant in &fresh {
            self.store.save(tenant).await?;
        }

        let meta = match self.store.load_meta().await? {
            Some(mut meta) => {
                meta.tenant_collection = CollectionStamp::now();
                meta
            }
            None => CacheMeta::new(),
        };
        self.store.save_meta(&meta).await?;

        info!("Refreshed and cached {} tenants", fresh.len());
        Ok(fresh)
    }

    async fn attach_costs(&self, tenants: &mut [Tenant], range: &DateRange) -> Result<()> {
        let mut meta = self
            .store
            .load_meta()
            .await?
            .ok_or(Error::CacheNotInitialized)?;

        if self.store.is_cost_range_cached(tenants, range).await? {
            debug!("Cost cache hit for range {}", range);
            let cached = self.store.load().await?;
            let by_id: HashMap<&str, &Tenant> = cached
                .iter()
                .map(|t| (t.platform_tenant_id.as_str(), t))
                .collect();
            for tenant in tenants.iter_mut() {
                if let Some(counterpart) = by_id.get(tenant.platform_tenant_id.as_str()) {
                    // The contract of this call is "the tenant's costs for
                    // exactly this range", so cached costs replace, not append
                    tenant.costs = counterpart.costs.clone();
                }
            }
            return Ok(());
        }

        debug!("Cost cache miss for range {}", range);
        self.inner.attach_costs(tenants, range).await?;

        for tenant in tenants.iter() {
            self.store.save(tenant).await?;
        }
        meta.cost_collection = Some(range.clone());
        self.store.save_meta(&meta).await?;
        Ok(())
    }

    async fn attach_role_assignments(&self, tenants: &mut [Tenant]) -> Result<()> {
        let mut meta = self
            .store
            .load_meta()
            .await?
            .ok_or(Error::CacheNotInitialized)?;

        if self.store.is_iam_fresh().await? {
            debug!("IAM cache hit, serving role assignments from store");
            let cached = self.store.load().await?;
            let by_id: HashMap<&str, &Tenant> = cached
                .iter()
                .map(|t| (t.platform_tenant_id.as_str(), t))
                .collect();
            for tenant in tenants.iter_mut() {
                if let Some(counterpart) = by_id.get(tenant.platform_tenant_id.as_str()) {
                    tenant.role_assignments = counterpart.role_assignments.clone();
                }
            }
            return Ok(());
        }

        debug!("IAM cache miss, refreshing role assignments");
        self.inner.attach_role_assignments(tenants).await?;

        for tenant in tenants.iter() {
            self.store.save(tenant).await?;
        }
        meta.iam_collection = Some(CollectionStamp::now());
        self.store.save_meta(&meta).await?;
        Ok(())
    }

    /// Writes always go live; no caching semantics
    async fn update_tenant(&self, updated: &Tenant, original: &Tenant) -> Result<()> {
        self.inner.update_tenant(updated, original).await
    }

    fn source_name(&self) -> &str {
        "cache"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::TenantCacheConfig;
    use crate::domain::tenant::{
        AssignmentSource, CostDetail, Platform, PrincipalType, RoleAssignment,
    };
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Fake source that counts calls and returns fixed tenants without costs
    struct CountingSource {
        tenant_ids: Vec<String>,
        list_calls: AtomicUsize,
        cost_calls: AtomicUsize,
        role_calls: AtomicUsize,
    }

    impl CountingSource {
        fn new(tenant_ids: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                tenant_ids: tenant_ids.iter().map(|s| s.to_string()).collect(),
                list_calls: AtomicUsize::new(0),
                cost_calls: AtomicUsize::new(0),
                role_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TenantAdapter for CountingSource {
        async fn get_tenants(&self) -> Result<Vec<Tenant>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .tenant_ids
                .iter()
                .map(|id| Tenant::new(Platform::Aws, id, format!("{id}-name")))
                .collect())
        }

        async fn attach_costs(&self, tenants: &mut [Tenant], range: &DateRange) -> Result<()> {
            self.cost_calls.fetch_add(1, Ordering::SeqCst);
            for tenant in tenants.iter_mut() {
                tenant.costs.push(CostEntry {
                    from: range.from,
                    to: range.to,
                    currency: "USD".into(),
                    total_cost: "12.34".into(),
                    details: vec![CostDetail {
                        name: "compute".into(),
                        amount: "12.34".into(),
                    }],
                });
            }
            Ok(())
        }

        async fn attach_role_assignments(&self, tenants: &mut [Tenant]) -> Result<()> {
            self.role_calls.fetch_add(1, Ordering::SeqCst);
            for tenant in tenants.iter_mut() {
                tenant.role_assignments.push(RoleAssignment {
                    principal_id: "u-1".into(),
                    principal_name: "alice".into(),
                    principal_type: PrincipalType::User,
                    role_id: "r-1".into(),
                    role_name: "owner".into(),
                    assignment_source: AssignmentSource::Tenant,
                    assignment_id: "ra-1".into(),
                });
            }
            Ok(())
        }

        async fn update_tenant(&self, _updated: &Tenant, _original: &Tenant) -> Result<()> {
            Ok(())
        }

        fn source_name(&self) -> &str {
            "counting"
        }
    }

    async fn caching(
        dir: &TempDir,
        delay: Duration,
        source: Arc<CountingSource>,
    ) -> CachingTenantAdapter {
        let store = TenantCacheStore::with_config(TenantCacheConfig {
            root_path: dir.path().to_path_buf(),
            eviction_delay: delay,
        })
        .await
        .unwrap();
        CachingTenantAdapter::new(source, store)
    }

    fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const DAY: Duration = Duration::from_secs(24 * 3600);

    #[tokio::test]
    async fn test_inventory_cache_hit_skips_source() {
        let dir = TempDir::new().unwrap();
        let source = CountingSource::new(&["a1", "a2"]);
        let adapter = caching(&dir, DAY, source.clone()).await;

        let first = adapter.get_tenants().await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);

        let second = adapter.get_tenants().await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_delay_always_refreshes() {
        let dir = TempDir::new().unwrap();
        let source = CountingSource::new(&["a1"]);
        let adapter = caching(&dir, Duration::ZERO, source.clone()).await;

        adapter.get_tenants().await.unwrap();
        adapter.get_tenants().await.unwrap();
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cost_history_survives_inventory_refresh() {
        let dir = TempDir::new().unwrap();
        let source = CountingSource::new(&["a1"]);
        // Zero delay forces a fresh fetch on every inventory call
        let adapter = caching(&dir, Duration::ZERO, source.clone()).await;

        let mut tenants = adapter.get_tenants().await.unwrap();
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31));
        adapter.attach_costs(&mut tenants, &range).await.unwrap();
        assert_eq!(tenants[0].costs.len(), 1);

        // The source returns tenants with empty costs; the decorator must
        // splice the persisted history back in
        let refreshed = adapter.get_tenants().await.unwrap();
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed[0].costs.len(), 1);
        assert_eq!(refreshed[0].costs[0].total_cost, "12.34");
    }

    #[tokio::test]
    async fn test_exact_range_cost_cache() {
        let dir = TempDir::new().unwrap();
        let source = CountingSource::new(&["a1"]);
        let adapter = caching(&dir, DAY, source.clone()).await;

        let mut tenants = adapter.get_tenants().await.unwrap();
        let january = DateRange::new(date(2024, 1, 1), date(2024, 1, 31));

        adapter.attach_costs(&mut tenants, &january).await.unwrap();
        assert_eq!(source.cost_calls.load(Ordering::SeqCst), 1);

        // Identical range: served from cache, source untouched
        adapter.attach_costs(&mut tenants, &january).await.unwrap();
        assert_eq!(source.cost_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tenants[0].costs.len(), 1);

        // Different range: miss, source called again
        let february = DateRange::new(date(2024, 2, 1), date(2024, 2, 28));
        adapter.attach_costs(&mut tenants, &february).await.unwrap();
        assert_eq!(source.cost_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_attach_costs_requires_initialized_cache() {
        let dir = TempDir::new().unwrap();
        let source = CountingSource::new(&["a1"]);
        let adapter = caching(&dir, DAY, source).await;

        let mut tenants = vec![Tenant::new(Platform::Aws, "a1", "a1-name")];
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31));
        let result = adapter.attach_costs(&mut tenants, &range).await;
        assert_matches!(result, Err(Error::CacheNotInitialized));
    }

    #[tokio::test]
    async fn test_iam_cache_hit_replaces_assignments() {
        let dir = TempDir::new().unwrap();
        let source = CountingSource::new(&["a1"]);
        let adapter = caching(&dir, DAY, source.clone()).await;

        let mut tenants = adapter.get_tenants().await.unwrap();
        adapter
            .attach_role_assignments(&mut tenants)
            .await
            .unwrap();
        assert_eq!(source.role_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tenants[0].role_assignments.len(), 1);

        // Second attach is served from cache and replaces, not appends
        adapter
            .attach_role_assignments(&mut tenants)
            .await
            .unwrap();
        assert_eq!(source.role_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tenants[0].role_assignments.len(), 1);
        assert_eq!(tenants[0].role_assignments[0].principal_name, "alice");
    }

    #[tokio::test]
    async fn test_meta_stamp_set_on_refresh() {
        let dir = TempDir::new().unwrap();
        let source = CountingSource::new(&["a1", "b1"]);
        let adapter = caching(&dir, DAY, source).await;

        let before = chrono::Utc::now();
        adapter.get_tenants().await.unwrap();

        let meta = adapter.store().load_meta().await.unwrap().unwrap();
        let stamp = meta.tenant_collection.last_collection;
        assert!(stamp >= before);
        assert!(chrono::Utc::now().signed_duration_since(stamp) < chrono::Duration::seconds(5));
        assert!(meta.iam_collection.is_none());
        assert!(meta.cost_collection.is_none());
    }
}

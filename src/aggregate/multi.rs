//! Multi-Source Adapter
//!
//! Presents N platform adapters as a single [`TenantAdapter`], fanning out
//! concurrently and routing write-back calls to the adapter that originally
//! produced each tenant.

use crate::domain::ports::{DateRange, TenantAdapter, TenantAdapterRef};
use crate::domain::tenant::{OwnerHandle, Tenant};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Fans out to all configured source adapters and tracks which source
/// produced which tenant
///
/// Ownership is recorded by stamping every returned tenant with an opaque
/// handle carrying the fetch generation and the source index. The handle
/// table is effectively rebuilt on every `get_tenants()` call: bumping the
/// generation invalidates all handles from earlier calls, so an attach or
/// update with a stale tenant fails loudly instead of routing to the wrong
/// adapter.
///
/// Not safe for concurrent top-level `get_tenants()` calls on the same
/// instance; callers must serialize inventory fetches.
pub struct MultiSourceAdapter {
    sources: Vec<TenantAdapterRef>,
    generation: AtomicU64,
}

impl MultiSourceAdapter {
    pub fn new(sources: Vec<TenantAdapterRef>) -> Self {
        Self {
            sources,
            generation: AtomicU64::new(0),
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Resolve the owning source index for a tenant, failing loudly if the
    /// tenant was never registered by the current fetch generation
    fn owner_index(&self, tenant: &Tenant) -> Result<usize> {
        let generation = self.generation.load(Ordering::SeqCst);
        match tenant.owner {
            Some(handle)
                if handle.generation == generation && handle.source < self.sources.len() =>
            {
                Ok(handle.source)
            }
            _ => Err(Error::TenantNotRegistered {
                platform: tenant.platform,
                tenant_id: tenant.platform_tenant_id.clone(),
            }),
        }
    }

    fn source_of(&self, tenant: &Tenant) -> Option<usize> {
        tenant.owner.map(|h| h.source)
    }
}

#[async_trait]
impl TenantAdapter for MultiSourceAdapter {
    async fn get_tenants(&self) -> Result<Vec<Tenant>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Fetching tenants from {} sources", self.sources.len());

        // All-or-nothing: one failing source fails the whole fetch
        let batches =
            future::try_join_all(self.sources.iter().map(|source| source.get_tenants())).await?;

        let mut tenants = Vec::new();
        for (source, mut batch) in batches.into_iter().enumerate() {
            for tenant in &mut batch {
                tenant.owner = Some(OwnerHandle { generation, source });
            }
            tenants.append(&mut batch);
        }

        info!(
            "Aggregated {} tenants across {} sources",
            tenants.len(),
            self.sources.len()
        );
        Ok(tenants)
    }

    /// Groups tenants by owning source and attaches costs concurrently, each
    /// source receiving only its own subset
    ///
    /// The input slice is reordered so that same-owner tenants are
    /// contiguous; aggregate ordering is unspecified.
    async fn attach_costs(&self, tenants: &mut [Tenant], range: &DateRange) -> Result<()> {
        for tenant in tenants.iter() {
            self.owner_index(tenant)?;
        }
        tenants.sort_by_key(|t| self.source_of(t).unwrap_or(usize::MAX));

        let mut calls = Vec::new();
        let mut rest = tenants;
        while !rest.is_empty() {
            let source = self.owner_index(&rest[0])?;
            let run = rest
                .iter()
                .take_while(|t| self.source_of(t) == Some(source))
                .count();
            let slice = rest;
            let (chunk, tail) = slice.split_at_mut(run);
            rest = tail;
            calls.push(self.sources[source].attach_costs(chunk, range));
        }

        future::try_join_all(calls).await?;
        Ok(())
    }

    /// Same grouping and fan-out pattern as [`Self::attach_costs`]
    async fn attach_role_assignments(&self, tenants: &mut [Tenant]) -> Result<()> {
        for tenant in tenants.iter() {
            self.owner_index(tenant)?;
        }
        tenants.sort_by_key(|t| self.source_of(t).unwrap_or(usize::MAX));

        let mut calls = Vec::new();
        let mut rest = tenants;
        while !rest.is_empty() {
            let source = self.owner_index(&rest[0])?;
            let run = rest
                .iter()
                .take_while(|t| self.source_of(t) == Some(source))
                .count();
            let slice = rest;
            let (chunk, tail) = slice.split_at_mut(run);
            rest = tail;
            calls.push(self.sources[source].attach_role_assignments(chunk));
        }

        future::try_join_all(calls).await?;
        Ok(())
    }

    async fn update_tenant(&self, updated: &Tenant, original: &Tenant) -> Result<()> {
        let source = self
            .owner_index(original)
            .or_else(|_| self.owner_index(updated))?;
        self.sources[source].update_tenant(updated, original).await
    }

    fn source_name(&self) -> &str {
        "multi-source"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tenant::Platform;
    use assert_matches::assert_matches;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fake source that records which tenant ids each call received
    struct RecordingSource {
        name: String,
        platform: Platform,
        tenant_ids: Vec<String>,
        fail_listing: bool,
        cost_calls: Mutex<Vec<Vec<String>>>,
        role_calls: Mutex<Vec<Vec<String>>>,
        update_calls: Mutex<Vec<String>>,
    }

    impl RecordingSource {
        fn new(name: &str, platform: Platform, tenant_ids: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                platform,
                tenant_ids: tenant_ids.iter().map(|s| s.to_string()).collect(),
                fail_listing: false,
                cost_calls: Mutex::new(Vec::new()),
                role_calls: Mutex::new(Vec::new()),
                update_calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(name: &str, platform: Platform) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                platform,
                tenant_ids: Vec::new(),
                fail_listing: true,
                cost_calls: Mutex::new(Vec::new()),
                role_calls: Mutex::new(Vec::new()),
                update_calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TenantAdapter for RecordingSource {
        async fn get_tenants(&self) -> Result<Vec<Tenant>> {
            if self.fail_listing {
                return Err(Error::Unauthenticated {
                    platform: self.platform,
                });
            }
            Ok(self
                .tenant_ids
                .iter()
                .map(|id| Tenant::new(self.platform, id, format!("{id}-name")))
                .collect())
        }

        async fn attach_costs(&self, tenants: &mut [Tenant], _range: &DateRange) -> Result<()> {
            self.cost_calls
                .lock()
                .push(tenants.iter().map(|t| t.platform_tenant_id.clone()).collect());
            Ok(())
        }

        async fn attach_role_assignments(&self, tenants: &mut [Tenant]) -> Result<()> {
            self.role_calls
                .lock()
                .push(tenants.iter().map(|t| t.platform_tenant_id.clone()).collect());
            Ok(())
        }

        async fn update_tenant(&self, updated: &Tenant, _original: &Tenant) -> Result<()> {
            self.update_calls.lock().push(updated.platform_tenant_id.clone());
            Ok(())
        }

        fn source_name(&self) -> &str {
            &self.name
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_fan_out_aggregates_all_sources() {
        let aws = RecordingSource::new("aws", Platform::Aws, &["a1", "a2"]);
        let gcp = RecordingSource::new("gcp", Platform::Gcp, &["g1"]);
        let multi = MultiSourceAdapter::new(vec![aws as TenantAdapterRef, gcp as _]);

        let tenants = multi.get_tenants().await.unwrap();
        assert_eq!(tenants.len(), 3);
        assert!(tenants.iter().all(|t| t.owner.is_some()));
    }

    #[tokio::test]
    async fn test_fan_out_fails_fast() {
        let aws = RecordingSource::new("aws", Platform::Aws, &["a1"]);
        let azure = RecordingSource::failing("azure", Platform::Azure);
        let multi = MultiSourceAdapter::new(vec![aws as TenantAdapterRef, azure as _]);

        let result = multi.get_tenants().await;
        assert_matches!(
            result,
            Err(Error::Unauthenticated {
                platform: Platform::Azure
            })
        );
    }

    #[tokio::test]
    async fn test_attach_costs_grouped_by_owner() {
        let aws = RecordingSource::new("aws", Platform::Aws, &["a1", "a2"]);
        let gcp = RecordingSource::new("gcp", Platform::Gcp, &["g1"]);
        let multi =
            MultiSourceAdapter::new(vec![aws.clone() as TenantAdapterRef, gcp.clone() as _]);

        let mut tenants = multi.get_tenants().await.unwrap();
        multi.attach_costs(&mut tenants, &range()).await.unwrap();

        let aws_calls = aws.cost_calls.lock();
        assert_eq!(aws_calls.len(), 1);
        assert_eq!(aws_calls[0], vec!["a1".to_string(), "a2".to_string()]);

        let gcp_calls = gcp.cost_calls.lock();
        assert_eq!(gcp_calls.len(), 1);
        assert_eq!(gcp_calls[0], vec!["g1".to_string()]);
    }

    #[tokio::test]
    async fn test_update_routed_to_owning_source() {
        let a = RecordingSource::new("aws", Platform::Aws, &["a1"]);
        let b = RecordingSource::new("azure", Platform::Azure, &["b1"]);
        let multi = MultiSourceAdapter::new(vec![a.clone() as TenantAdapterRef, b.clone() as _]);

        let tenants = multi.get_tenants().await.unwrap();
        let original = tenants
            .iter()
            .find(|t| t.platform_tenant_id == "a1")
            .unwrap();
        let updated = original.clone();

        multi.update_tenant(&updated, original).await.unwrap();

        assert_eq!(*a.update_calls.lock(), vec!["a1".to_string()]);
        assert!(b.update_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_tenant_is_programmer_error() {
        let aws = RecordingSource::new("aws", Platform::Aws, &["a1"]);
        let multi = MultiSourceAdapter::new(vec![aws as TenantAdapterRef]);

        // Never passed through get_tenants
        let mut tenants = vec![Tenant::new(Platform::Aws, "stray", "stray")];
        let result = multi.attach_costs(&mut tenants, &range()).await;
        assert_matches!(result, Err(Error::TenantNotRegistered { .. }));
    }

    #[tokio::test]
    async fn test_refetch_invalidates_old_handles() {
        let aws = RecordingSource::new("aws", Platform::Aws, &["a1"]);
        let multi = MultiSourceAdapter::new(vec![aws as TenantAdapterRef]);

        let mut stale = multi.get_tenants().await.unwrap();
        let _fresh = multi.get_tenants().await.unwrap();

        // Handles from the first fetch belong to a superseded generation
        let result = multi.attach_role_assignments(&mut stale).await;
        assert_matches!(result, Err(Error::TenantNotRegistered { .. }));
    }
}

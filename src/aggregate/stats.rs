//! Query Statistics Recorder
//!
//! Layered call-duration accumulation used to attribute latency to either
//! the cache layer or individual platforms. The layer is an integer nesting
//! depth: deeper (higher) layers supersede shallower ones, so when a cache
//! miss triggers real platform calls, only the platform durations end up
//! reported and the cache layer's own overhead is dropped.

use crate::domain::ports::{DateRange, TenantAdapter, TenantAdapterRef};
use crate::domain::tenant::Tenant;
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// Query Statistics
// =============================================================================

struct StatsInner {
    durations: BTreeMap<String, Duration>,
    last_layer: u32,
}

/// Accumulates per-source query durations, keeping only the deepest layer
/// that actually ran
pub struct QueryStatistics {
    inner: Mutex<StatsInner>,
}

impl QueryStatistics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatsInner {
                durations: BTreeMap::new(),
                last_layer: 0,
            }),
        }
    }

    /// Time a query and attribute its duration to `source` at `layer`
    ///
    /// - same layer as the last recorded one: duration accumulates
    /// - deeper layer: the whole duration map is reset and restarts there
    /// - shallower layer: the duration is discarded
    ///
    /// Errors from the query propagate without being recorded.
    pub async fn record<T, F>(&self, source: &str, layer: u32, query: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        let start = Instant::now();
        let value = query.await?;
        self.observe(source, layer, start.elapsed());
        Ok(value)
    }

    fn observe(&self, source: &str, layer: u32, elapsed: Duration) {
        let mut inner = self.inner.lock();
        match layer.cmp(&inner.last_layer) {
            std::cmp::Ordering::Equal => {
                *inner.durations.entry(source.to_string()).or_default() += elapsed;
            }
            std::cmp::Ordering::Greater => {
                inner.durations.clear();
                inner.durations.insert(source.to_string(), elapsed);
                inner.last_layer = layer;
            }
            // A shallower wrapper is not interesting once a deeper layer
            // has already reported
            std::cmp::Ordering::Less => {}
        }
    }

    /// Snapshot of the recorded durations
    pub fn durations(&self) -> BTreeMap<String, Duration> {
        self.inner.lock().durations.clone()
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.durations.clear();
        inner.last_layer = 0;
    }
}

impl Default for QueryStatistics {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Instrumented Adapter
// =============================================================================

/// Decorator that records every call against a shared [`QueryStatistics`]
///
/// Composition order decides what is measured: wrapping the caching layer
/// measures cache hits, wrapping each platform source measures only real
/// platform latency. Reordering is plain re-wrapping.
pub struct InstrumentedAdapter {
    inner: TenantAdapterRef,
    stats: Arc<QueryStatistics>,
    label: String,
    layer: u32,
}

impl InstrumentedAdapter {
    pub fn new(
        inner: TenantAdapterRef,
        stats: Arc<QueryStatistics>,
        label: impl Into<String>,
        layer: u32,
    ) -> Self {
        Self {
            inner,
            stats,
            label: label.into(),
            layer,
        }
    }
}

#[async_trait]
impl TenantAdapter for InstrumentedAdapter {
    async fn get_tenants(&self) -> Result<Vec<Tenant>> {
        self.stats
            .record(&self.label, self.layer, self.inner.get_tenants())
            .await
    }

    async fn attach_costs(&self, tenants: &mut [Tenant], range: &DateRange) -> Result<()> {
        self.stats
            .record(&self.label, self.layer, self.inner.attach_costs(tenants, range))
            .await
    }

    async fn attach_role_assignments(&self, tenants: &mut [Tenant]) -> Result<()> {
        self.stats
            .record(
                &self.label,
                self.layer,
                self.inner.attach_role_assignments(tenants),
            )
            .await
    }

    async fn update_tenant(&self, updated: &Tenant, original: &Tenant) -> Result<()> {
        self.stats
            .record(
                &self.label,
                self.layer,
                self.inner.update_tenant(updated, original),
            )
            .await
    }

    fn source_name(&self) -> &str {
        &self.label
    }
}

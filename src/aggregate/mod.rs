//! Aggregation layers
//!
//! The layers compose as interface-implementing decorators around the
//! per-platform adapters:
//!
//! ```text
//! consumer
//!    │
//!    ▼
//! InstrumentedAdapter ("cache", layer 0)
//!    │
//!    ▼
//! CachingTenantAdapter ──── TenantCacheStore (one file per tenant + meta)
//!    │ (on miss)
//!    ▼
//! MultiSourceAdapter ── concurrent fail-fast fan-out, ownership routing
//!    │
//!    ├─▶ InstrumentedAdapter ("aws", layer 1)   ─▶ platform adapter
//!    ├─▶ InstrumentedAdapter ("azure", layer 1) ─▶ platform adapter
//!    └─▶ InstrumentedAdapter ("gcp", layer 1)   ─▶ platform adapter
//! ```
//!
//! Because every layer implements the same trait, the measurement and
//! caching order can be changed by re-wrapping.

pub mod caching;
pub mod limiter;
pub mod multi;
pub mod stats;

pub use caching::CachingTenantAdapter;
pub use limiter::{ConcurrencyLimiter, DEFAULT_MAX_IN_FLIGHT};
pub use multi::MultiSourceAdapter;
pub use stats::{InstrumentedAdapter, QueryStatistics};

use crate::cache::store::TenantCacheStore;
use crate::domain::ports::TenantAdapterRef;
use std::sync::Arc;

/// Statistics layer of the caching decorator
pub const CACHE_LAYER: u32 = 0;
/// Statistics layer of the individual platform adapters
pub const PLATFORM_LAYER: u32 = 1;

/// Assemble the standard aggregation stack
///
/// Each source is instrumented at the platform layer, fanned out through the
/// multi-source adapter, wrapped with the cache store, and the whole stack
/// instrumented at the cache layer. On a cache hit only the cache duration
/// is reported; on a miss the platform durations supersede it.
pub fn build_cached_adapter(
    sources: Vec<TenantAdapterRef>,
    store: TenantCacheStore,
    stats: Arc<QueryStatistics>,
) -> TenantAdapterRef {
    let instrumented: Vec<TenantAdapterRef> = sources
        .into_iter()
        .map(|source| {
            let label = source.source_name().to_string();
            Arc::new(InstrumentedAdapter::new(
                source,
                stats.clone(),
                label,
                PLATFORM_LAYER,
            )) as TenantAdapterRef
        })
        .collect();

    let multi = Arc::new(MultiSourceAdapter::new(instrumented));
    let caching = Arc::new(CachingTenantAdapter::new(multi, store));
    Arc::new(InstrumentedAdapter::new(
        caching,
        stats,
        "cache",
        CACHE_LAYER,
    ))
}

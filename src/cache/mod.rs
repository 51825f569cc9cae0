//! Tenant cache persistence
//!
//! Durable, directory-backed storage for aggregated tenant records with
//! independently aged data categories:
//!
//! - **Inventory**: tenant records, aged by the eviction delay
//! - **IAM**: role assignments, aged by the same delay but stamped separately
//! - **Costs**: cached per exact date range, not by age
//!
//! The layout is one JSON file per tenant plus a `meta.json` holding the
//! per-category collection stamps, so a single corrupt file never
//! invalidates the whole cache.

pub mod meta;
pub mod store;

pub use meta::{is_fresh, CacheMeta, CollectionStamp, CACHE_VERSION};
pub use store::{TenantCacheConfig, TenantCacheStore, DEFAULT_EVICTION_DELAY_HOURS};

//! Cloud Tenant Aggregator
//!
//! Unifies inventory, cost, and IAM data for cloud tenants (AWS accounts,
//! Azure subscriptions, GCP projects) behind one data model, so downstream
//! code never has to know which cloud a tenant came from.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Consumer (one adapter)                     │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────────┐      ┌────────────────────────────────┐  │
//! │  │  Query Statistics     │      │  Tenant Cache Store            │  │
//! │  │  (layered durations)  │      │  (file per tenant + metadata)  │  │
//! │  └───────────┬───────────┘      └───────────────┬────────────────┘  │
//! │              │                                  │                   │
//! │     ┌────────┴──────────────────────────────────┴────────┐          │
//! │     │            Caching Aggregation Decorator           │          │
//! │     └──────────────────────────┬─────────────────────────┘          │
//! │                                │ (on miss)                          │
//! │     ┌──────────────────────────┴─────────────────────────┐          │
//! │     │    Multi-Source Adapter (concurrent fan-out,       │          │
//! │     │    ownership routing for write-back)               │          │
//! │     └───────┬──────────────────┬──────────────────┬──────┘          │
//! ├─────────────┼──────────────────┼──────────────────┼─────────────────┤
//! │      ┌──────┴──────┐    ┌──────┴──────┐    ┌──────┴──────┐          │
//! │      │     AWS     │    │    Azure    │    │     GCP     │          │
//! │      │   adapter   │    │   adapter   │    │   adapter   │          │
//! │      └─────────────┘    └─────────────┘    └─────────────┘          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`domain`]: the unified tenant model and the adapter capability port
//! - [`adapters`]: platform adapter implementations (in-memory stub)
//! - [`aggregate`]: multi-source fan-out, caching decorator, statistics
//! - [`cache`]: directory-backed tenant persistence with per-category aging
//! - [`error`]: error types and handling

pub mod adapters;
pub mod aggregate;
pub mod cache;
pub mod domain;
pub mod error;

// Re-export commonly used types
pub use adapters::{InMemoryAdapter, InMemoryAdapterConfig};

pub use aggregate::{
    build_cached_adapter, CachingTenantAdapter, ConcurrencyLimiter, InstrumentedAdapter,
    MultiSourceAdapter, QueryStatistics, CACHE_LAYER, DEFAULT_MAX_IN_FLIGHT, PLATFORM_LAYER,
};

pub use cache::{
    CacheMeta, CollectionStamp, TenantCacheConfig, TenantCacheStore, CACHE_VERSION,
    DEFAULT_EVICTION_DELAY_HOURS,
};

pub use domain::{
    tag_delta, AssignmentSource, CostDetail, CostEntry, DateRange, Platform, PrincipalType,
    RoleAssignment, Tag, TagDelta, Tenant, TenantAdapter, TenantAdapterRef,
};

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

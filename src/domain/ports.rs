//! Domain Ports - Core trait definitions for the tenant aggregator
//!
//! These traits define the boundaries between the aggregation core and the
//! per-cloud adapters. Platform adapters, the multi-source fan-out, and the
//! caching/instrumentation decorators all implement the same capability
//! interface so layers compose transparently.

use crate::domain::tenant::Tenant;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive date range for cost collection
///
/// The cost cache matches ranges exactly: any different range, including a
/// sub-range of an already cached window, is a cache miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: chrono::NaiveDate,
    pub to: chrono::NaiveDate,
}

impl DateRange {
    pub fn new(from: chrono::NaiveDate, to: chrono::NaiveDate) -> Self {
        Self { from, to }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

// =============================================================================
// Tenant Adapter Port
// =============================================================================

/// Capability interface for tenant data sources
///
/// One implementation exists per connected cloud platform (translating these
/// calls into CLI invocations), and the aggregation layers implement the same
/// trait on top of those.
///
/// Attach-style calls mutate the given tenants in place, appending cost
/// entries or role assignments. Any call may fail with a non-retryable
/// platform error or with [`crate::Error::RateLimited`]; rate limiting is
/// handled by delay-then-retry inside the platform adapter itself, callers
/// simply await the result.
#[async_trait]
pub trait TenantAdapter: Send + Sync {
    /// List all tenants known to this source
    ///
    /// Tenants are constructed fresh on every call and carry no cost or IAM
    /// data; those are attached separately.
    async fn get_tenants(&self) -> Result<Vec<Tenant>>;

    /// Attach cost entries for the given range to the given tenants
    async fn attach_costs(&self, tenants: &mut [Tenant], range: &DateRange) -> Result<()>;

    /// Attach IAM role assignments to the given tenants
    async fn attach_role_assignments(&self, tenants: &mut [Tenant]) -> Result<()>;

    /// Write changed tags of `updated` (relative to `original`) back to the
    /// platform
    async fn update_tenant(&self, updated: &Tenant, original: &Tenant) -> Result<()>;

    /// Short name of this source, used for logging and statistics labels
    fn source_name(&self) -> &str;
}

/// Type alias for Arc'd adapters
pub type TenantAdapterRef = Arc<dyn TenantAdapter>;

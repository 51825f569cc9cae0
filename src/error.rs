//! Error types for the tenant aggregator
//!
//! Provides structured error types for all aggregation components including
//! platform adapters, the multi-source fan-out, and the tenant cache store.

use crate::domain::tenant::Platform;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Unified error type for the aggregator
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    /// A tenant was passed to an attach or update call without having been
    /// returned by a preceding `get_tenants()` on the same multi-source
    /// adapter. This is a call-order bug, not a runtime condition.
    #[error("Tenant {platform}/{tenant_id} is not registered with any source adapter (call get_tenants first)")]
    TenantNotRegistered {
        platform: Platform,
        tenant_id: String,
    },

    // =========================================================================
    // Platform Errors
    // =========================================================================
    #[error("Not authenticated against {platform} (run the platform CLI login first)")]
    Unauthenticated { platform: Platform },

    #[error("Platform command failed: {platform} - {reason}")]
    PlatformCommand { platform: Platform, reason: String },

    #[error("Rate limited by {platform}, retry after {delay_secs}s")]
    RateLimited { platform: Platform, delay_secs: u64 },

    #[error("Invalid value for tag {tag}: {value:?} - {reason}")]
    InvalidTagValue {
        tag: String,
        value: String,
        reason: String,
    },

    // =========================================================================
    // Cache Errors
    // =========================================================================
    #[error("Tenant cache is not initialized, collect tenants first")]
    CacheNotInitialized,

    #[error("Cache file {path} is corrupt ({reason}), clear the cache and retry")]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("Cache version {found} does not match expected {expected}, clear the cache and retry")]
    CacheVersionMismatch { found: u32, expected: u32 },

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is retryable after a delay
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    /// Suggested delay before retrying, if any
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { delay_secs, .. } => Some(Duration::from_secs(*delay_secs)),
            _ => None,
        }
    }

    /// Check if clearing the cache is the documented remedy
    pub fn is_cache_corruption(&self) -> bool {
        matches!(
            self,
            Error::CacheCorrupt { .. } | Error::CacheVersionMismatch { .. }
        )
    }
}

/// Result type alias for the aggregator
pub type Result<T> = std::result::Result<T, Error>;

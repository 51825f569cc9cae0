//! Cache metadata
//!
//! One [`CacheMeta`] record is persisted per cache store. It tracks, per data
//! category, when that category was last collected so that inventory, IAM,
//! and cost data age out independently.

use crate::domain::ports::DateRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Current on-disk cache format version
pub const CACHE_VERSION: u32 = 1;

/// Timestamp of the last successful collection of one data category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStamp {
    pub last_collection: DateTime<Utc>,
}

impl CollectionStamp {
    pub fn now() -> Self {
        Self {
            last_collection: Utc::now(),
        }
    }
}

/// Persisted cache metadata
///
/// Created on the first successful inventory collection, mutated on every
/// successful refresh of the corresponding category, and removed only by an
/// explicit cache clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub version: u32,
    pub tenant_collection: CollectionStamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_collection: Option<CollectionStamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_collection: Option<DateRange>,
}

impl CacheMeta {
    /// Metadata for a cache whose inventory was just collected
    pub fn new() -> Self {
        Self {
            version: CACHE_VERSION,
            tenant_collection: CollectionStamp::now(),
            iam_collection: None,
            cost_collection: None,
        }
    }
}

impl Default for CacheMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// Freshness as a pure function of observation time, collection time, and
/// the configured eviction delay
///
/// A zero delay disables caching entirely: nothing is ever fresh.
pub fn is_fresh(now: DateTime<Utc>, last_collection: DateTime<Utc>, delay: Duration) -> bool {
    if delay.is_zero() {
        return false;
    }
    match chrono::Duration::from_std(delay) {
        Ok(delay) => now.signed_duration_since(last_collection) <= delay,
        // Delay too large to represent means it can never be exceeded
        Err(_) => true,
    }
}

//! Tenant Cache Store
//!
//! Directory-backed persistence for tenant records: one JSON file per tenant
//! plus one metadata file recording collection timestamps per data category.
//! One file per tenant means a single corrupt or partial write never
//! invalidates the whole cache.
//!
//! The store assumes single-process access (the CLI's single invocation per
//! process usage pattern); there is no file locking.

use crate::cache::meta::{is_fresh, CacheMeta, CACHE_VERSION};
use crate::domain::ports::DateRange;
use crate::domain::tenant::Tenant;
use crate::error::{Error, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

// =============================================================================
// Configuration
// =============================================================================

/// Default eviction delay for inventory and IAM data
pub const DEFAULT_EVICTION_DELAY_HOURS: u64 = 24;

/// Name of the metadata file inside the cache directory
const META_FILE_NAME: &str = "meta.json";

/// Configuration for the tenant cache store
///
/// The eviction delay is passed in explicitly so freshness evaluation stays a
/// pure function of `(now, last_collection, delay)` with no ambient state.
#[derive(Debug, Clone)]
pub struct TenantCacheConfig {
    /// Directory holding the tenant files and metadata
    pub root_path: PathBuf,
    /// Age after which cached inventory/IAM data is considered stale
    pub eviction_delay: Duration,
}

impl Default for TenantCacheConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("/var/cache/cloud-tenants"),
            eviction_delay: Duration::from_secs(DEFAULT_EVICTION_DELAY_HOURS * 3600),
        }
    }
}

// =============================================================================
// Tenant Cache Store
// =============================================================================

/// Durable, file-based persistence of tenant records and cache metadata
pub struct TenantCacheStore {
    root_path: PathBuf,
    eviction_delay: Duration,
}

impl TenantCacheStore {
    /// Open (creating if needed) a cache store at the configured directory
    pub async fn with_config(config: TenantCacheConfig) -> Result<Self> {
        fs::create_dir_all(&config.root_path).await?;
        Ok(Self {
            root_path: config.root_path,
            eviction_delay: config.eviction_delay,
        })
    }

    /// Open a cache store at the given path with the default eviction delay
    pub async fn with_path(root_path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(TenantCacheConfig {
            root_path: root_path.into(),
            ..Default::default()
        })
        .await
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Deterministic file name for a tenant, derived from
    /// `(platform, name, id)`
    pub fn tenant_file_name(tenant: &Tenant) -> String {
        let raw = format!(
            "{}-{}-{}",
            tenant.platform, tenant.platform_tenant_name, tenant.platform_tenant_id
        );
        let safe: String = raw
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        format!("{safe}.json")
    }

    fn tenant_path(&self, tenant: &Tenant) -> PathBuf {
        self.root_path.join(Self::tenant_file_name(tenant))
    }

    fn meta_path(&self) -> PathBuf {
        self.root_path.join(META_FILE_NAME)
    }

    // =========================================================================
    // Freshness
    // =========================================================================

    /// True iff metadata exists and the inventory collection is within the
    /// eviction delay
    pub async fn is_inventory_fresh(&self) -> Result<bool> {
        let meta = match self.load_meta().await? {
            Some(m) => m,
            None => return Ok(false),
        };
        Ok(is_fresh(
            Utc::now(),
            meta.tenant_collection.last_collection,
            self.eviction_delay,
        ))
    }

    /// True iff IAM data was ever collected and is within the eviction delay
    pub async fn is_iam_fresh(&self) -> Result<bool> {
        let meta = match self.load_meta().await? {
            Some(m) => m,
            None => return Ok(false),
        };
        let stamp = match meta.iam_collection {
            Some(s) => s,
            None => return Ok(false),
        };
        Ok(is_fresh(
            Utc::now(),
            stamp.last_collection,
            self.eviction_delay,
        ))
    }

    /// True iff the cached cost range equals `range` exactly and every
    /// requested tenant has a cached file
    ///
    /// Exact-match policy: requesting a sub-range of an already cached
    /// window is still a miss.
    pub async fn is_cost_range_cached(
        &self,
        tenants: &[Tenant],
        range: &DateRange,
    ) -> Result<bool> {
        let meta = match self.load_meta().await? {
            Some(m) => m,
            None => return Ok(false),
        };
        if meta.cost_collection.as_ref() != Some(range) {
            return Ok(false);
        }
        for tenant in tenants {
            if !fs::try_exists(self.tenant_path(tenant)).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // =========================================================================
    // Tenant Persistence
    // =========================================================================

    /// Read every persisted tenant in the store directory
    ///
    /// Fails with a cache-corruption error if any file does not hold a valid
    /// serialized tenant; the remedy is always to clear the cache.
    pub async fn load(&self) -> Result<Vec<Tenant>> {
        let mut paths = Vec::new();
        let mut entries = fs::read_dir(&self.root_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
            let is_meta = path
                .file_name()
                .map(|n| n == META_FILE_NAME)
                .unwrap_or(false);
            if is_json && !is_meta {
                paths.push(path);
            }
        }
        // Directory iteration order is platform-dependent
        paths.sort();

        let mut tenants = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs::read_to_string(&path).await?;
            let tenant: Tenant =
                serde_json::from_str(&content).map_err(|e| Error::CacheCorrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            tenants.push(tenant);
        }

        debug!("Loaded {} tenants from cache", tenants.len());
        Ok(tenants)
    }

    /// Write or overwrite one tenant's file
    pub async fn save(&self, tenant: &Tenant) -> Result<()> {
        let path = self.tenant_path(tenant);
        let content = serde_json::to_string_pretty(tenant).map_err(|e| {
            Error::Internal(format!(
                "Failed to serialize tenant {}: {}",
                tenant.platform_tenant_id, e
            ))
        })?;
        fs::write(&path, content).await?;
        debug!(
            "Persisted tenant {}/{} to {}",
            tenant.platform,
            tenant.platform_tenant_id,
            path.display()
        );
        Ok(())
    }

    // =========================================================================
    // Metadata Persistence
    // =========================================================================

    /// Load cache metadata, `None` if the cache was never written
    pub async fn load_meta(&self) -> Result<Option<CacheMeta>> {
        let path = self.meta_path();
        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta: CacheMeta = serde_json::from_str(&content).map_err(|e| Error::CacheCorrupt {
            path,
            reason: e.to_string(),
        })?;
        if meta.version != CACHE_VERSION {
            return Err(Error::CacheVersionMismatch {
                found: meta.version,
                expected: CACHE_VERSION,
            });
        }
        Ok(Some(meta))
    }

    pub async fn save_meta(&self, meta: &CacheMeta) -> Result<()> {
        let content = serde_json::to_string_pretty(meta)
            .map_err(|e| Error::Internal(format!("Failed to serialize cache metadata: {}", e)))?;
        fs::write(self.meta_path(), content).await?;
        Ok(())
    }

    /// Empty the store directory, removing all tenants and metadata
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.root_path).await?;
        info!("Cleared tenant cache at {}", self.root_path.display());
        Ok(())
    }
}

//! In-Memory Platform Adapter
//!
//! A self-contained [`TenantAdapter`] backed by fixture data. Real platform
//! adapters shell out to the respective cloud CLI; this one serves the same
//! contract from memory, which makes it the reference implementation for the
//! adapter-layer behaviors the aggregation core relies on:
//!
//! - rate limiting handled by delay-then-retry inside the adapter, invisible
//!   to callers once resolved
//! - per-tenant sub-calls bounded by the concurrency limiter
//! - tag write-back as a delta against the original tenant, with value
//!   validation
//!
//! Availability and rate-limit injection hooks exist for tests.

use crate::aggregate::limiter::ConcurrencyLimiter;
use crate::domain::ports::{DateRange, TenantAdapter};
use crate::domain::tenant::{tag_delta, CostDetail, CostEntry, Platform, RoleAssignment, Tenant};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::future;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the in-memory adapter
#[derive(Debug, Clone)]
pub struct InMemoryAdapterConfig {
    /// Platform this adapter pretends to be
    pub platform: Platform,
    /// Source label used in logs and statistics
    pub name: String,
    /// Currency of generated cost entries
    pub currency: String,
    /// Attempts after the first call when rate limited
    pub max_retries: u32,
    /// Overrides the platform-suggested retry delay (tests use zero)
    pub retry_delay_override: Option<Duration>,
    /// Bound on simultaneous per-tenant sub-calls
    pub max_in_flight: usize,
}

impl InMemoryAdapterConfig {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            name: platform.to_string(),
            currency: "USD".to_string(),
            max_retries: 3,
            retry_delay_override: None,
            max_in_flight: crate::aggregate::limiter::DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

// =============================================================================
// In-Memory Adapter
// =============================================================================

/// Fixture-backed platform adapter
pub struct InMemoryAdapter {
    config: InMemoryAdapterConfig,
    /// Tenant fixtures by platform tenant id
    tenants: RwLock<BTreeMap<String, Tenant>>,
    /// Cost amount per tenant id, "0.00" when unset
    amounts: RwLock<BTreeMap<String, String>>,
    /// Role assignments per tenant id
    roles: RwLock<BTreeMap<String, Vec<RoleAssignment>>>,
    limiter: ConcurrencyLimiter,
    available: AtomicBool,
    authenticated: AtomicBool,
    /// Number of upcoming calls to reject with a rate limit
    rate_limited: AtomicU32,
}

impl InMemoryAdapter {
    pub fn new(config: InMemoryAdapterConfig) -> Self {
        let limiter = ConcurrencyLimiter::new(config.max_in_flight);
        Self {
            config,
            tenants: RwLock::new(BTreeMap::new()),
            amounts: RwLock::new(BTreeMap::new()),
            roles: RwLock::new(BTreeMap::new()),
            limiter,
            available: AtomicBool::new(true),
            authenticated: AtomicBool::new(true),
            rate_limited: AtomicU32::new(0),
        }
    }

    /// Seed a tenant fixture
    pub async fn insert_tenant(&self, tenant: Tenant) {
        self.tenants
            .write()
            .await
            .insert(tenant.platform_tenant_id.clone(), tenant);
    }

    /// Set the cost amount returned for a tenant
    pub async fn set_cost(&self, tenant_id: impl Into<String>, amount: impl Into<String>) {
        self.amounts
            .write()
            .await
            .insert(tenant_id.into(), amount.into());
    }

    /// Add a role assignment returned for a tenant
    pub async fn add_role_assignment(
        &self,
        tenant_id: impl Into<String>,
        assignment: RoleAssignment,
    ) {
        self.roles
            .write()
            .await
            .entry(tenant_id.into())
            .or_default()
            .push(assignment);
    }

    /// Current fixture state of a tenant (for asserting write-backs)
    pub async fn tenant(&self, tenant_id: &str) -> Option<Tenant> {
        self.tenants.read().await.get(tenant_id).cloned()
    }

    /// Toggle availability (for testing)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Toggle authentication state (for testing)
    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }

    /// Reject the next `calls` gated operations with a rate limit
    pub fn inject_rate_limits(&self, calls: u32) {
        self.rate_limited.store(calls, Ordering::SeqCst);
    }

    /// Single gate check, consuming one injected rate limit if armed
    fn gate(&self) -> Result<()> {
        if !self.authenticated.load(Ordering::SeqCst) {
            return Err(Error::Unauthenticated {
                platform: self.config.platform,
            });
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(Error::PlatformCommand {
                platform: self.config.platform,
                reason: "platform CLI unavailable".to_string(),
            });
        }
        let armed = self
            .rate_limited
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if armed.is_ok() {
            return Err(Error::RateLimited {
                platform: self.config.platform,
                delay_secs: 1,
            });
        }
        Ok(())
    }

    /// Gate check with delay-then-retry on rate limiting
    ///
    /// Callers above this adapter never see a rate limit unless the retry
    /// budget is exhausted.
    async fn gate_with_retry(&self) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.gate() {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self
                        .config
                        .retry_delay_override
                        .or_else(|| e.retry_delay())
                        .unwrap_or_default();
                    warn!(
                        "{} rate limited, retry {}/{} in {:?}",
                        self.config.name, attempt, self.config.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    fn validate_tag_value(&self, tag: &str, value: &str) -> Result<()> {
        let reason = if value.is_empty() {
            "value must not be empty"
        } else if value.len() > 256 {
            "value exceeds 256 characters"
        } else if value.chars().any(|c| c.is_control()) {
            "value contains control characters"
        } else {
            return Ok(());
        };
        Err(Error::InvalidTagValue {
            tag: tag.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        })
    }

    async fn cost_entry_for(&self, tenant: &Tenant, range: &DateRange) -> CostEntry {
        let amounts = self.amounts.read().await;
        let total = amounts
            .get(&tenant.platform_tenant_id)
            .cloned()
            .unwrap_or_else(|| "0.00".to_string());
        CostEntry {
            from: range.from,
            to: range.to,
            currency: self.config.currency.clone(),
            total_cost: total.clone(),
            details: vec![CostDetail {
                name: "total".to_string(),
                amount: total,
            }],
        }
    }
}

#[async_trait]
impl TenantAdapter for InMemoryAdapter {
    async fn get_tenants(&self) -> Result<Vec<Tenant>> {
        self.gate_with_retry().await?;
        let tenants = self.tenants.read().await;
        // Inventory listings are always fresh constructions without cost or
        // IAM data; those are attached separately
        let listed: Vec<Tenant> = tenants
            .values()
            .map(|t| Tenant {
                costs: Vec::new(),
                role_assignments: Vec::new(),
                owner: None,
                ..t.clone()
            })
            .collect();
        debug!("{} listed {} tenants", self.config.name, listed.len());
        Ok(listed)
    }

    async fn attach_costs(&self, tenants: &mut [Tenant], range: &DateRange) -> Result<()> {
        self.gate_with_retry().await?;

        // One sub-call per tenant, bounded by the limiter
        let entries = future::join_all(tenants.iter().map(|tenant| {
            self.limiter
                .run(async { self.cost_entry_for(tenant, range).await })
        }))
        .await;

        for (tenant, entry) in tenants.iter_mut().zip(entries) {
            tenant.costs.push(entry);
        }
        Ok(())
    }

    async fn attach_role_assignments(&self, tenants: &mut [Tenant]) -> Result<()> {
        self.gate_with_retry().await?;
        let roles = self.roles.read().await;
        for tenant in tenants.iter_mut() {
            if let Some(assignments) = roles.get(&tenant.platform_tenant_id) {
                tenant.role_assignments.extend(assignments.iter().cloned());
            }
        }
        Ok(())
    }

    async fn update_tenant(&self, updated: &Tenant, original: &Tenant) -> Result<()> {
        self.gate_with_retry().await?;

        let delta = tag_delta(&original.tags, &updated.tags);
        if delta.is_empty() {
            debug!(
                "{} update for {} carries no tag changes",
                self.config.name, updated.platform_tenant_id
            );
            return Ok(());
        }

        for tag in delta.added.iter().chain(delta.changed.iter()) {
            for value in &tag.values {
                self.validate_tag_value(&tag.name, value)?;
            }
        }

        let mut tenants = self.tenants.write().await;
        let record = tenants
            .get_mut(&updated.platform_tenant_id)
            .ok_or_else(|| Error::PlatformCommand {
                platform: self.config.platform,
                reason: format!("unknown tenant {}", updated.platform_tenant_id),
            })?;
        record.tags = updated.tags.clone();

        info!(
            "{} updated tags on {}: {} added, {} changed, {} removed",
            self.config.name,
            updated.platform_tenant_id,
            delta.added.len(),
            delta.changed.len(),
            delta.removed.len()
        );
        Ok(())
    }

    fn source_name(&self) -> &str {
        &self.config.name
    }
}

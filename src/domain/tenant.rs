//! Unified tenant model
//!
//! The [`Tenant`] record unifies AWS accounts, Azure subscriptions, and GCP
//! projects behind one data model so that downstream code never needs to know
//! which cloud a record came from. Tenants are pure data: they are constructed
//! by platform adapters on every inventory refresh, enriched in place by cost
//! and IAM attachment, and persisted/loaded by the tenant cache store.

use serde::{Deserialize, Serialize};

// =============================================================================
// Platform
// =============================================================================

/// Cloud platforms supported by the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Aws,
    Azure,
    Gcp,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Aws => write!(f, "aws"),
            Platform::Azure => write!(f, "azure"),
            Platform::Gcp => write!(f, "gcp"),
        }
    }
}

// =============================================================================
// Tags
// =============================================================================

/// A single tag on a tenant
///
/// Tag names are unique within one tenant; the ordered `Vec` preserves the
/// ordering the platform reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub values: Vec<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Difference between two tag sets, used for write-back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    /// Tags present in the updated set only
    pub added: Vec<Tag>,
    /// Tags present in both sets with different values (updated values)
    pub changed: Vec<Tag>,
    /// Names of tags present in the original set only
    pub removed: Vec<String>,
}

impl TagDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Compute the tag delta between an original and an updated tag set
///
/// Platform adapters use this to write back only the tags that actually
/// changed instead of re-submitting the full set.
pub fn tag_delta(original: &[Tag], updated: &[Tag]) -> TagDelta {
    let mut delta = TagDelta::default();

    for tag in updated {
        match original.iter().find(|o| o.name == tag.name) {
            None => delta.added.push(tag.clone()),
            Some(o) if o.values != tag.values => delta.changed.push(tag.clone()),
            Some(_) => {}
        }
    }

    for tag in original {
        if !updated.iter().any(|u| u.name == tag.name) {
            delta.removed.push(tag.name.clone());
        }
    }

    delta
}

// =============================================================================
// Costs
// =============================================================================

/// A single cost line item within a collection window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostDetail {
    /// Line item name (service, resource group, ...)
    pub name: String,
    /// String-encoded decimal amount
    pub amount: String,
}

/// Cost collected for one tenant over one collection window
///
/// Cost amounts are string-encoded decimals; the aggregator never does
/// arithmetic on them. Entries accumulate across collection windows and are
/// appended, not replaced, except on an exact-range cost cache hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEntry {
    pub from: chrono::NaiveDate,
    pub to: chrono::NaiveDate,
    pub currency: String,
    pub total_cost: String,
    pub details: Vec<CostDetail>,
}

// =============================================================================
// Role Assignments
// =============================================================================

/// Principal kinds a role can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    User,
    Group,
    TechnicalUser,
}

/// Where in the tenant hierarchy an assignment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentSource {
    Organization,
    Ancestor,
    Tenant,
}

/// One IAM role assignment on a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub principal_id: String,
    pub principal_name: String,
    pub principal_type: PrincipalType,
    pub role_id: String,
    pub role_name: String,
    pub assignment_source: AssignmentSource,
    pub assignment_id: String,
}

// =============================================================================
// Owner Handle
// =============================================================================

/// Opaque routing token assigned by the multi-source adapter
///
/// Ties a tenant to the source adapter that produced it within one
/// `get_tenants()` call. Deliberately not serialized: a tenant loaded from
/// the cache has no owner and must be re-registered by a fresh inventory
/// fetch before attach or update calls can be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerHandle {
    /// Fetch generation the handle was assigned in
    pub(crate) generation: u64,
    /// Index of the owning source adapter
    pub(crate) source: usize,
}

// =============================================================================
// Tenant
// =============================================================================

/// Unified record for one cloud account / subscription / project
///
/// The `(platform, platform_tenant_id)` pair is unique within one aggregated
/// result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    /// Cloud-native identifier (account id / subscription id / project id)
    pub platform_tenant_id: String,
    /// Human-readable name
    pub platform_tenant_name: String,
    pub platform: Platform,
    pub tags: Vec<Tag>,
    pub costs: Vec<CostEntry>,
    pub role_assignments: Vec<RoleAssignment>,
    /// Platform-specific payload as originally returned by the adapter,
    /// retained so write-back operations can recover full-fidelity data
    pub native: serde_json::Value,
    /// Routing token, assigned per inventory fetch
    #[serde(skip)]
    pub(crate) owner: Option<OwnerHandle>,
}

impl Tenant {
    /// Create a tenant with no tags, costs, or role assignments
    pub fn new(
        platform: Platform,
        platform_tenant_id: impl Into<String>,
        platform_tenant_name: impl Into<String>,
    ) -> Self {
        Self {
            platform_tenant_id: platform_tenant_id.into(),
            platform_tenant_name: platform_tenant_name.into(),
            platform,
            tags: Vec::new(),
            costs: Vec::new(),
            role_assignments: Vec::new(),
            native: serde_json::Value::Null,
            owner: None,
        }
    }

    /// Look up a tag by name
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, values: &[&str]) -> Tag {
        Tag::new(name, values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(format!("{}", Platform::Aws), "aws");
        assert_eq!(format!("{}", Platform::Azure), "azure");
        assert_eq!(format!("{}", Platform::Gcp), "gcp");
    }

    #[test]
    fn test_tag_delta() {
        let original = vec![tag("env", &["prod"]), tag("team", &["storage"])];
        let updated = vec![tag("env", &["staging"]), tag("owner", &["alice"])];

        let delta = tag_delta(&original, &updated);

        assert_eq!(delta.added, vec![tag("owner", &["alice"])]);
        assert_eq!(delta.changed, vec![tag("env", &["staging"])]);
        assert_eq!(delta.removed, vec!["team".to_string()]);
        assert!(!delta.is_empty());
    }

    #[test]
    fn test_tag_delta_identical() {
        let tags = vec![tag("env", &["prod"])];
        assert!(tag_delta(&tags, &tags).is_empty());
    }

    #[test]
    fn test_owner_handle_not_serialized() {
        let mut tenant = Tenant::new(Platform::Gcp, "proj-1", "project one");
        tenant.owner = Some(OwnerHandle {
            generation: 3,
            source: 1,
        });

        let json = serde_json::to_string(&tenant).unwrap();
        let restored: Tenant = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.platform_tenant_id, "proj-1");
        assert_eq!(restored.owner, None);
    }

    #[test]
    fn test_tenant_lookup_tag() {
        let mut tenant = Tenant::new(Platform::Aws, "123456789012", "workloads");
        tenant.tags.push(tag("env", &["prod"]));

        assert_eq!(tenant.tag("env"), Some(&tag("env", &["prod"])));
        assert_eq!(tenant.tag("missing"), None);
    }
}

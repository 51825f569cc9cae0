//! Core domain types and traits

pub mod ports;
pub mod tenant;

pub use ports::{DateRange, TenantAdapter, TenantAdapterRef};
pub use tenant::{
    tag_delta, AssignmentSource, CostDetail, CostEntry, Platform, PrincipalType, RoleAssignment,
    Tag, TagDelta, Tenant,
};

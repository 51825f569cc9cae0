//! Platform Adapters
//!
//! Per-cloud implementations of the [`crate::domain::TenantAdapter`]
//! capability interface. Production adapters translate the interface into
//! cloud CLI invocations and live outside this crate; the in-memory adapter
//! here serves the same contract from fixture data for tests and demos.

pub mod in_memory;

pub use in_memory::{InMemoryAdapter, InMemoryAdapterConfig};

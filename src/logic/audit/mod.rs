//! Audit Store
//!
//! Durable record of apps, alerts and enforcement actions. Append-only
//! discipline for enforcement records; injected into the enforcement
//! machine rather than living as ambient global state.

pub mod store;
pub mod types;

pub use store::AuditStore;
pub use types::{AlertRecord, AppRecord, EnforcementRecord, StoreError};

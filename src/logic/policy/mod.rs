//! Policy
//!
//! Ordered rules mapping risk-score thresholds to enforcement actions, and
//! the selection logic over them. Decides WHAT should happen; the
//! enforcement machine decides whether and how it happens.

pub mod table;
pub mod types;

pub use table::PolicyTable;
pub use types::{EnforcementAction, PolicyRule};

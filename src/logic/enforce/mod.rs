//! Enforcement
//!
//! The state machine that turns (snapshot, score) pairs into enforcement
//! actions, the abstract capability it requests them through, and the audit
//! records it leaves behind.

pub mod capability;
pub mod machine;
pub mod types;


pub use capability::{EnforcementCapability, HostCapability};
pub use machine::EnforcementMachine;
pub use types::{Ack, CapabilityAction, CapabilityError, EvalState, Evaluation};

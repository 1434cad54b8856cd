//! Policy Types
//!
//! Data structures for policy rules. No decision logic here.

use serde::{Deserialize, Serialize};

// ============================================================================
// ENFORCEMENT ACTIONS
// ============================================================================

/// The closed set of responses a policy can demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnforcementAction {
    /// Kill the process outright
    Terminate,
    /// Pause execution, reversible
    Suspend,
    /// Cut the process off the network
    BlockNetwork,
    /// Strip undeclared capabilities
    RevokePermissions,
    /// Suspend + BlockNetwork, as one composite
    Quarantine,
    /// Mark the app trusted
    Whitelist,
}

impl EnforcementAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementAction::Terminate => "terminate",
            EnforcementAction::Suspend => "suspend",
            EnforcementAction::BlockNetwork => "block_network",
            EnforcementAction::RevokePermissions => "revoke_permissions",
            EnforcementAction::Quarantine => "quarantine",
            EnforcementAction::Whitelist => "whitelist",
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, EnforcementAction::Terminate)
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "terminate" => Some(EnforcementAction::Terminate),
            "suspend" => Some(EnforcementAction::Suspend),
            "block_network" => Some(EnforcementAction::BlockNetwork),
            "revoke_permissions" => Some(EnforcementAction::RevokePermissions),
            "quarantine" => Some(EnforcementAction::Quarantine),
            "whitelist" => Some(EnforcementAction::Whitelist),
            _ => None,
        }
    }
}

impl std::fmt::Display for EnforcementAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// POLICY RULE
// ============================================================================

/// One rule: fires when a score reaches its threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: String,
    /// Rule fires when score >= this value
    pub trigger_threshold: f64,
    pub action: EnforcementAction,
    /// Whether the action can be undone (e.g. a suspend can be resumed)
    pub reversible: bool,
    pub requires_approval: bool,
    pub description: String,
}

impl PolicyRule {
    pub fn matches(&self, score: f64) -> bool {
        score >= self.trigger_threshold
    }
}

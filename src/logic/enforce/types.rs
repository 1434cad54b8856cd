//! Enforcement Types
//!
//! Capability primitives, their errors, and the evaluation states the
//! machine walks through. No logic beyond formatting.

use serde::{Deserialize, Serialize};

// ============================================================================
// CAPABILITY PRIMITIVES
// ============================================================================

/// The primitive operations the platform capability layer must provide.
/// Composite policy actions (Quarantine) decompose into these before they
/// reach the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityAction {
    Terminate,
    Suspend,
    Resume,
    BlockNetwork,
}

impl CapabilityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityAction::Terminate => "terminate",
            CapabilityAction::Suspend => "suspend",
            CapabilityAction::Resume => "resume",
            CapabilityAction::BlockNetwork => "block_network",
        }
    }
}

impl std::fmt::Display for CapabilityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Positive acknowledgement from a capability call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub pid: u32,
    pub detail: String,
}

// ============================================================================
// CAPABILITY ERROR
// ============================================================================

/// Why a capability call did not succeed. Carries a human-readable cause;
/// the machine records it, it never crashes on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CapabilityError {
    /// Target process no longer exists
    ProcessNotFound { pid: u32 },
    /// The platform refused us
    AccessDenied { reason: String },
    /// The underlying command ran and failed
    CommandFailed { command: String, exit_code: i32, stderr: String },
    /// The call did not resolve within its bounded timeout
    Timeout { ms: u64 },
    /// No capability primitive exists for the requested action
    Unsupported { action: String },
    /// The request itself is invalid (e.g. resuming a never-suspended pid)
    Invalid { reason: String },
    /// Anything else
    Other { message: String },
}

impl std::fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityError::ProcessNotFound { pid } => write!(f, "Process {} not found", pid),
            CapabilityError::AccessDenied { reason } => write!(f, "Access denied: {}", reason),
            CapabilityError::CommandFailed { command, exit_code, stderr } => {
                write!(f, "Command '{}' failed ({}): {}", command, exit_code, stderr)
            }
            CapabilityError::Timeout { ms } => write!(f, "Capability call timed out after {}ms", ms),
            CapabilityError::Unsupported { action } => write!(f, "Unsupported action: {}", action),
            CapabilityError::Invalid { reason } => write!(f, "Invalid request: {}", reason),
            CapabilityError::Other { message } => write!(f, "Error: {}", message),
        }
    }
}

impl std::error::Error for CapabilityError {}

// ============================================================================
// EVALUATION STATES
// ============================================================================

/// States one process walks through inside a single evaluation cycle.
///
/// `Observed -> Scored -> PolicyMatched -> ActionRequested ->
/// {ActionSucceeded | ActionFailed}` or `Scored -> NoPolicyMatched`.
/// No state is revisited within a cycle; the next cycle starts fresh.
/// Monitor mode stops at PolicyMatched after writing its simulated record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalState {
    Observed,
    Scored,
    PolicyMatched,
    ActionRequested,
    ActionSucceeded,
    ActionFailed,
    NoPolicyMatched,
}

impl EvalState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EvalState::ActionSucceeded | EvalState::ActionFailed | EvalState::NoPolicyMatched
        )
    }
}

/// Where one evaluation cycle ended up.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub state: EvalState,
    pub matched_rule: Option<String>,
    pub action: Option<crate::logic::policy::EnforcementAction>,
}

impl Evaluation {
    pub fn no_match() -> Self {
        Self {
            state: EvalState::NoPolicyMatched,
            matched_rule: None,
            action: None,
        }
    }
}

//! Audit Types
//!
//! Rows the audit store owns, and the store's error type.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::policy::EnforcementAction;

// ============================================================================
// APP RECORD
// ============================================================================

/// Known application, keyed by executable path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRecord {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub hash_sha256: Option<String>,
    pub risk_score: f64,
    pub trusted: bool,
    pub last_seen: i64,
}

// ============================================================================
// ALERT RECORD
// ============================================================================

/// One raised alert. Stays unresolved until an operator clears it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub app_id: Option<i64>,
    pub pid: u32,
    pub message: String,
    pub risk_score: f64,
    pub resolved: bool,
    pub timestamp: i64,
    pub resolved_at: Option<i64>,
}

// ============================================================================
// ENFORCEMENT RECORD
// ============================================================================

/// One attempted enforcement action, real or simulated. Written exactly
/// once, after the capability call (or its timeout) resolves - never before.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementRecord {
    pub id: String,
    pub timestamp: i64,
    pub action: EnforcementAction,
    pub pid: u32,
    pub reason: String,
    pub success: bool,
    pub error: Option<String>,
    /// True when monitor mode logged the action instead of performing it
    pub simulated: bool,
}

impl EnforcementRecord {
    pub fn new(
        action: EnforcementAction,
        pid: u32,
        reason: &str,
        success: bool,
        error: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp(),
            action,
            pid,
            reason: reason.to_string(),
            success,
            error,
            simulated: false,
        }
    }

    pub fn simulated(action: EnforcementAction, pid: u32, reason: &str) -> Self {
        Self {
            simulated: true,
            ..Self::new(action, pid, reason, true, None)
        }
    }
}

// ============================================================================
// STORE ERROR
// ============================================================================

/// Audit persistence failures. Kept distinct from capability failures so
/// operators can tell "action failed" from "we lost the record of an
/// action".
#[derive(Debug, Clone)]
pub enum StoreError {
    /// Could not open or create the database
    Open { path: String, message: String },
    /// A statement failed
    Query { message: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Open { path, message } => {
                write!(f, "Cannot open audit store {}: {}", path, message)
            }
            StoreError::Query { message } => write!(f, "Audit store query failed: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Query {
            message: e.to_string(),
        }
    }
}

//! Runtime & Scoring Configuration
//!
//! All tunable numbers live here as named data, not as literals buried in
//! engine code. `Default` reproduces the shipped heuristics; a JSON config
//! file can override any of them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::policy::PolicyRule;

// ============================================================================
// OPERATING MODE
// ============================================================================

/// Global switch deciding whether matched policies are simulated or executed.
///
/// Selected at process start and immutable for the lifetime of the agent;
/// changing mode requires a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Alert only - actions are logged as "would execute", never performed
    Monitor,
    /// Matched policies execute for real
    Enforce,
    /// Enforce, with every policy threshold tightened
    Lockdown,
}

impl OperatingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::Monitor => "monitor",
            OperatingMode::Enforce => "enforce",
            OperatingMode::Lockdown => "lockdown",
        }
    }

    /// True when matched policies invoke the real capability layer.
    pub fn is_enforcing(&self) -> bool {
        matches!(self, OperatingMode::Enforce | OperatingMode::Lockdown)
    }
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// SCORING CONFIG
// ============================================================================

/// Per-factor weights. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorWeights {
    pub permission_abuse: f64,
    pub hidden_execution: f64,
    pub network_anomalies: f64,
    pub persistence_behavior: f64,
    pub resource_spikes: f64,
    pub masquerading_risk: f64,
}

impl FactorWeights {
    pub fn total(&self) -> f64 {
        self.permission_abuse
            + self.hidden_execution
            + self.network_anomalies
            + self.persistence_behavior
            + self.resource_spikes
            + self.masquerading_risk
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            permission_abuse: 0.25,
            hidden_execution: 0.20,
            network_anomalies: 0.20,
            persistence_behavior: 0.15,
            resource_spikes: 0.10,
            masquerading_risk: 0.10,
        }
    }
}

/// Every threshold and bonus the risk engine uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: FactorWeights,

    // Permission abuse
    /// Added when observed connections exceed the profile's allowance
    pub undeclared_connection_bonus: f64,
    pub open_file_limit: u32,
    pub excess_open_file_bonus: f64,

    // Hidden execution
    pub empty_command_line_bonus: f64,
    pub thread_count_limit: u32,
    pub thread_count_bonus: f64,

    // Network anomalies - tiers checked highest first, first match wins
    pub connection_tiers: Vec<(u32, f64)>,
    pub system_process_connection_limit: u32,
    pub system_process_network_bonus: f64,

    // Persistence
    pub system_context_bonus: f64,
    pub stale_create_time_bonus: f64,

    // Resource spikes - tiers checked highest first, first match wins
    pub cpu_tiers: Vec<(f32, f64)>,
    pub mem_tiers: Vec<(f32, f64)>,

    // Masquerading
    pub name_mismatch_bonus: f64,
    pub risky_extension_bonus: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            undeclared_connection_bonus: 20.0,
            open_file_limit: 50,
            excess_open_file_bonus: 15.0,
            empty_command_line_bonus: 25.0,
            thread_count_limit: 100,
            thread_count_bonus: 20.0,
            connection_tiers: vec![(50, 40.0), (20, 20.0), (5, 10.0)],
            system_process_connection_limit: 2,
            system_process_network_bonus: 30.0,
            system_context_bonus: 25.0,
            stale_create_time_bonus: 15.0,
            cpu_tiers: vec![(80.0, 30.0), (50.0, 15.0)],
            mem_tiers: vec![(50.0, 30.0), (20.0, 15.0)],
            name_mismatch_bonus: 35.0,
            risky_extension_bonus: 40.0,
        }
    }
}

// ============================================================================
// RUNTIME CONFIG
// ============================================================================

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub mode: OperatingMode,
    pub poll_interval_secs: u64,
    pub capability_timeout_ms: u64,
    /// Subtracted from every policy threshold in lockdown mode (floor 0)
    pub lockdown_offset: f64,
    /// Audit database path; defaults to the local data directory
    pub db_path: Option<PathBuf>,
    /// Compute SHA-256 of executables during snapshot capture
    pub hash_executables: bool,
    pub scoring: ScoringConfig,
    /// Replacement policy rules; None keeps the shipped three-rule table
    pub policy_rules: Option<Vec<PolicyRule>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::Monitor,
            poll_interval_secs: constants::get_poll_interval(),
            capability_timeout_ms: constants::get_capability_timeout_ms(),
            lockdown_offset: constants::DEFAULT_LOCKDOWN_OFFSET,
            db_path: None,
            hash_executables: true,
            scoring: ScoringConfig::default(),
            policy_rules: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file, filling gaps with defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Config loading errors.
#[derive(Debug, Clone)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "Cannot read config {}: {}", path.display(), message)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "Invalid config {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// TESTS
// ============================================================================

//! Central Configuration Constants
//!
//! Single source of truth for static detection tables and defaults.
//! To change a default interval or path, only edit this file.

/// App name
pub const APP_NAME: &str = "ProcSentry";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default snapshot polling interval (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default per-call enforcement capability timeout (milliseconds)
pub const DEFAULT_CAPABILITY_TIMEOUT_MS: u64 = 5_000;

/// Default threshold tightening applied to every policy rule in lockdown mode
pub const DEFAULT_LOCKDOWN_OFFSET: f64 = 15.0;

/// Process names expected to be network-quiet system infrastructure.
///
/// Used two ways: a system process with more than a couple of open
/// connections is suspicious, and a "system" user context on a process NOT
/// in this list is suspicious.
pub const KNOWN_SYSTEM_PROCESSES: &[&str] = &["svchost", "csrss", "services", "lsass"];

/// Typosquat substrings resembling trusted system binaries, with the
/// severity each match adds to the hidden-execution factor.
pub const TYPOSQUAT_PENALTIES: &[(&str, f64)] = &[
    ("svch0st", 50.0), // vs svchost
    ("lsasa", 60.0),   // vs lsass
    ("csrsa", 50.0),   // vs csrss
    ("nvcssa", 40.0),  // vs nvcsvc
];

/// Extensions that should never show up as a process name.
pub const RISKY_EXTENSIONS: &[&str] = &[".scr", ".pif", ".bat", ".cmd", ".vbs", ".js"];

/// Creation timestamps below this are treated as malformed or spoofed.
pub const CREATE_TIME_SANITY_FLOOR: f64 = 1e9;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get polling interval from environment or use default
pub fn get_poll_interval() -> u64 {
    std::env::var("PROCSENTRY_POLL_INTERVAL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
}

/// Get capability timeout from environment or use default
pub fn get_capability_timeout_ms() -> u64 {
    std::env::var("PROCSENTRY_CAPABILITY_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_CAPABILITY_TIMEOUT_MS)
}

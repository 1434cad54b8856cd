//! Permission Baseline
//!
//! Declared capability sets for known application names, plus the running
//! count of capability accesses actually observed. Answers one question for
//! the risk engine: "is this access declared?".

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// ============================================================================
// CAPABILITY TAGS
// ============================================================================

pub const CAP_FILESYSTEM: &str = "filesystem";
pub const CAP_FILESYSTEM_READ: &str = "filesystem_read";
pub const CAP_NETWORK: &str = "network";
pub const CAP_CAMERA: &str = "camera";
pub const CAP_MICROPHONE: &str = "microphone";
pub const CAP_AUDIO: &str = "audio";

/// Shipped declarations for well-known applications. Anything not listed
/// starts with an empty declared set.
static KNOWN_DECLARATIONS: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| {
        let mut m: HashMap<&str, &[&str]> = HashMap::new();
        m.insert("notepad.exe", &[CAP_FILESYSTEM_READ, CAP_NETWORK]);
        m.insert("chrome.exe", &[CAP_FILESYSTEM, CAP_NETWORK, CAP_CAMERA, CAP_MICROPHONE]);
        m.insert("zoom.exe", &[CAP_CAMERA, CAP_MICROPHONE, CAP_NETWORK, CAP_AUDIO]);
        m.insert("explorer.exe", &[CAP_FILESYSTEM, CAP_NETWORK]);
        m
    });

// ============================================================================
// PERMISSION PROFILE
// ============================================================================

/// One application's declared capabilities and observed access counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionProfile {
    pub app_name: String,
    pub declared: HashSet<String>,
    pub access_counts: HashMap<String, u64>,
}

impl PermissionProfile {
    /// Build a profile, falling back to the shipped declarations (or an
    /// empty set) when no explicit capability list is given.
    pub fn new(app_name: &str, declared: Option<Vec<String>>) -> Self {
        let declared = match declared {
            Some(caps) => caps.into_iter().collect(),
            None => KNOWN_DECLARATIONS
                .get(app_name.to_lowercase().as_str())
                .map(|caps| caps.iter().map(|c| c.to_string()).collect())
                .unwrap_or_default(),
        };

        Self {
            app_name: app_name.to_string(),
            declared,
            access_counts: HashMap::new(),
        }
    }

    /// Is this capability in the declared set?
    pub fn is_declared(&self, capability: &str) -> bool {
        self.declared.contains(capability)
    }

    /// Count one observed access.
    pub fn record_access(&mut self, capability: &str) {
        *self.access_counts.entry(capability.to_string()).or_insert(0) += 1;
    }

    /// Connection count this app is allowed before the permission-abuse
    /// factor starts charging for it.
    ///
    /// Derived from the app name rather than from declared capabilities;
    /// a deliberately coarse knob, kept behind this method so replacing it
    /// does not touch the engine.
    pub fn connection_allowance(&self) -> u32 {
        self.app_name.matches('.').count() as u32
    }
}

// ============================================================================
// BASELINE
// ============================================================================

/// Shared profile registry. Read-mostly; profile creation and access
/// counting synchronize through the write lock. Profiles are never removed
/// during a run.
pub struct PermissionBaseline {
    profiles: RwLock<HashMap<String, PermissionProfile>>,
}

impl PermissionBaseline {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
        }
    }

    /// Profile for an app name, created on first sight.
    ///
    /// Returns a clone so callers never hold the registry lock across
    /// scoring or enforcement.
    pub fn profile_for(&self, app_name: &str) -> PermissionProfile {
        let key = app_name.to_lowercase();

        if let Some(profile) = self.profiles.read().get(&key) {
            return profile.clone();
        }

        let mut profiles = self.profiles.write();
        profiles
            .entry(key)
            .or_insert_with(|| PermissionProfile::new(app_name, None))
            .clone()
    }

    /// Count one observed capability access for an app, creating its
    /// profile if this is the first sighting.
    pub fn observe_access(&self, app_name: &str, capability: &str) {
        let key = app_name.to_lowercase();
        let mut profiles = self.profiles.write();
        let profile = profiles
            .entry(key)
            .or_insert_with(|| PermissionProfile::new(app_name, None));

        if !profile.is_declared(capability) {
            log::debug!("Undeclared {} access by {}", capability, app_name);
        }
        profile.record_access(capability);
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }
}

impl Default for PermissionBaseline {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

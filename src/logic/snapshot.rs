//! Process Snapshot Source
//!
//! One point-in-time observation per process: identity, behavior and
//! resource metrics. The scoring engine consumes snapshots read-only; how
//! they are captured is this module's problem alone.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sysinfo::{System, Users};

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Immutable process observation.
///
/// Fields a capture backend cannot provide default to zero / empty; the
/// scoring engine is total over that input domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    // Identity
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    pub executable: String,
    pub hash_sha256: Option<String>,

    // Behavior
    pub command_line: String,
    pub user_context: String,
    pub status: String,
    /// Creation time, seconds since epoch. Zero when the platform hides it;
    /// the persistence factor treats sub-epoch values as malformed.
    pub create_time: f64,

    // Resources
    pub cpu_percent: f32,
    pub mem_percent: f32,
    pub num_threads: u32,
    pub connections: u32,
    pub open_files: u32,

    /// Observation time
    pub timestamp: DateTime<Utc>,
}

impl Default for ProcessSnapshot {
    fn default() -> Self {
        Self {
            pid: 0,
            ppid: 0,
            name: String::new(),
            executable: String::new(),
            hash_sha256: None,
            command_line: String::new(),
            user_context: String::new(),
            status: String::new(),
            create_time: 0.0,
            cpu_percent: 0.0,
            mem_percent: 0.0,
            num_threads: 0,
            connections: 0,
            open_files: 0,
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// SOURCE TRAIT
// ============================================================================

/// Producer of one snapshot batch per polling cycle.
///
/// An empty batch is a valid batch.
pub trait SnapshotSource: Send {
    fn collect(&mut self) -> Vec<ProcessSnapshot>;
}

// ============================================================================
// SYSINFO SOURCE
// ============================================================================

/// Live snapshot source backed by the sysinfo crate.
///
/// Thread, connection and open-file counts are not exposed uniformly across
/// platforms by sysinfo; they stay at zero here and richer platform
/// collectors can fill them in upstream.
pub struct SysinfoSource {
    system: System,
    users: Users,
    hash_executables: bool,
}

impl SysinfoSource {
    pub fn new(hash_executables: bool) -> Self {
        Self {
            system: System::new_all(),
            users: Users::new_with_refreshed_list(),
            hash_executables,
        }
    }
}

impl SnapshotSource for SysinfoSource {
    fn collect(&mut self) -> Vec<ProcessSnapshot> {
        self.system.refresh_processes();
        self.system.refresh_memory();

        let total_memory = self.system.total_memory().max(1);
        let now = Utc::now();
        let mut out = Vec::with_capacity(self.system.processes().len());

        for (pid, proc) in self.system.processes() {
            let executable = proc
                .exe()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();

            let hash_sha256 = if self.hash_executables && !executable.is_empty() {
                hash_file(Path::new(&executable))
            } else {
                None
            };

            let user_context = proc
                .user_id()
                .and_then(|uid| self.users.get_user_by_id(uid))
                .map(|u| u.name().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            out.push(ProcessSnapshot {
                pid: pid.as_u32(),
                ppid: proc.parent().map(|p| p.as_u32()).unwrap_or(0),
                name: proc.name().to_string(),
                executable,
                hash_sha256,
                command_line: proc.cmd().join(" "),
                user_context,
                status: proc.status().to_string(),
                create_time: proc.start_time() as f64,
                cpu_percent: proc.cpu_usage(),
                mem_percent: (proc.memory() as f64 / total_memory as f64 * 100.0) as f32,
                num_threads: 0,
                connections: 0,
                open_files: 0,
                timestamp: now,
            });
        }

        log::debug!("Collected {} process snapshots", out.len());
        out
    }
}

/// SHA-256 of a file, chunked. None on any I/O failure - an unreadable
/// executable is not worth failing a capture cycle over.
pub fn hash_file(path: &Path) -> Option<String> {
    let mut file = std::fs::File::open(path).ok()?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Some(hex::encode(hasher.finalize()))
}

// ============================================================================
// TESTS
// ============================================================================

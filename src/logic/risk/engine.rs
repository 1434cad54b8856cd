//! Risk Scoring Engine
//!
//! Turns one process snapshot (plus an optional permission profile) into a
//! total score in [0,100] and a per-factor breakdown. Pure and total: every
//! input scores, nothing here touches I/O or shared state.
//!
//! Each factor sums the penalties of every rule it triggers, clamps to
//! [0,100], and contributes weight * severity to the total, which is
//! clamped again.

use crate::constants::{
    CREATE_TIME_SANITY_FLOOR, KNOWN_SYSTEM_PROCESSES, RISKY_EXTENSIONS, TYPOSQUAT_PENALTIES,
};
use crate::logic::baseline::PermissionProfile;
use crate::logic::config::ScoringConfig;
use crate::logic::snapshot::ProcessSnapshot;

use super::types::{FactorScores, RiskAssessment, RiskLevel};

// ============================================================================
// MAIN SCORING FUNCTIONS
// ============================================================================

/// Score a snapshot with the default configuration.
pub fn score(snapshot: &ProcessSnapshot, profile: Option<&PermissionProfile>) -> RiskAssessment {
    score_with_config(snapshot, profile, &ScoringConfig::default())
}

/// Score a snapshot with explicit thresholds and weights.
pub fn score_with_config(
    snapshot: &ProcessSnapshot,
    profile: Option<&PermissionProfile>,
    config: &ScoringConfig,
) -> RiskAssessment {
    let factors = FactorScores {
        permission_abuse: permission_abuse(snapshot, profile, config),
        hidden_execution: hidden_execution(snapshot, config),
        network_anomalies: network_anomalies(snapshot, config),
        persistence_behavior: persistence_behavior(snapshot, config),
        resource_spikes: resource_spikes(snapshot, config),
        masquerading_risk: masquerading_risk(snapshot, config),
    };

    let total: f64 = factors
        .iter()
        .map(|(factor, severity)| factor.weight(&config.weights) * severity)
        .sum();
    let total = total.clamp(0.0, 100.0);

    RiskAssessment {
        score: total,
        level: RiskLevel::from_score(total),
        factors,
    }
}

/// One-line alert summary: process, pid, level, score, dominant factor.
pub fn alert_message(snapshot: &ProcessSnapshot, assessment: &RiskAssessment) -> String {
    let (top_factor, _) = assessment.factors.top();
    format!(
        "ALERT: {} (PID {}) - Risk Level: {} ({:.0}/100) | Primary concern: {}",
        snapshot.name, snapshot.pid, assessment.level, assessment.score, top_factor
    )
}

// ============================================================================
// FACTORS
// ============================================================================

/// Resource access beyond what the app's profile allows.
fn permission_abuse(
    snapshot: &ProcessSnapshot,
    profile: Option<&PermissionProfile>,
    config: &ScoringConfig,
) -> f64 {
    let mut severity = 0.0;

    if let Some(profile) = profile {
        if snapshot.connections > profile.connection_allowance() {
            severity += config.undeclared_connection_bonus;
        }
        if snapshot.open_files > config.open_file_limit {
            severity += config.excess_open_file_bonus;
        }
    }

    clamp_severity(severity)
}

/// Obfuscation patterns: typosquatted system names, missing command lines,
/// thread counts that look like injection.
fn hidden_execution(snapshot: &ProcessSnapshot, config: &ScoringConfig) -> f64 {
    let mut severity = 0.0;
    let name = snapshot.name.to_lowercase();

    for (substring, penalty) in TYPOSQUAT_PENALTIES {
        if name.contains(substring) {
            severity += penalty;
        }
    }

    if snapshot.command_line.trim().is_empty() {
        severity += config.empty_command_line_bonus;
    }

    if snapshot.num_threads > config.thread_count_limit {
        severity += config.thread_count_bonus;
    }

    clamp_severity(severity)
}

/// Connection volume plus chatter from processes expected to be quiet.
fn network_anomalies(snapshot: &ProcessSnapshot, config: &ScoringConfig) -> f64 {
    let mut severity = tier_sum(snapshot.connections as f64, &config.connection_tiers);

    if is_system_process(&snapshot.name)
        && snapshot.connections > config.system_process_connection_limit
    {
        severity += config.system_process_network_bonus;
    }

    clamp_severity(severity)
}

/// System-context user apps and timestamps that predate plausibility.
fn persistence_behavior(snapshot: &ProcessSnapshot, config: &ScoringConfig) -> f64 {
    let mut severity = 0.0;

    if snapshot.user_context.to_lowercase().contains("system")
        && !is_system_process(&snapshot.name)
    {
        severity += config.system_context_bonus;
    }

    if snapshot.create_time < CREATE_TIME_SANITY_FLOOR {
        severity += config.stale_create_time_bonus;
    }

    clamp_severity(severity)
}

/// CPU and memory consumption spikes, summed independently.
fn resource_spikes(snapshot: &ProcessSnapshot, config: &ScoringConfig) -> f64 {
    let severity = tier_sum(snapshot.cpu_percent as f64, &config.cpu_tiers)
        + tier_sum(snapshot.mem_percent as f64, &config.mem_tiers);

    clamp_severity(severity)
}

/// Name/executable mismatches and extensions no real process name carries.
fn masquerading_risk(snapshot: &ProcessSnapshot, config: &ScoringConfig) -> f64 {
    let mut severity = 0.0;
    let name = snapshot.name.to_lowercase();
    let exe = snapshot.executable.to_lowercase();

    let basename = exe
        .rsplit(|c| c == '\\' || c == '/')
        .next()
        .unwrap_or_default();
    if basename != name && !exe.contains(&name) {
        severity += config.name_mismatch_bonus;
    }

    if RISKY_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        severity += config.risky_extension_bonus;
    }

    clamp_severity(severity)
}

// ============================================================================
// HELPERS
// ============================================================================

fn is_system_process(name: &str) -> bool {
    let name = name.to_lowercase();
    KNOWN_SYSTEM_PROCESSES.iter().any(|s| name.contains(s))
}

/// Sum the penalties of every tier the value exceeds.
fn tier_sum<T: Into<f64> + Copy>(value: f64, tiers: &[(T, f64)]) -> f64 {
    tiers
        .iter()
        .filter(|(threshold, _)| value > (*threshold).into())
        .map(|(_, penalty)| penalty)
        .sum()
}

fn clamp_severity(severity: f64) -> f64 {
    severity.clamp(0.0, 100.0)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::FactorWeights;
    use crate::logic::risk::types::RiskFactor;

    fn snap(name: &str) -> ProcessSnapshot {
        ProcessSnapshot {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_benign_workstation_process_is_safe() {
        let snapshot = ProcessSnapshot {
            name: "notepad.exe".to_string(),
            pid: 1234,
            command_line: "C:\\Windows\\notepad.exe".to_string(),
            user_context: "User".to_string(),
            cpu_percent: 0.5,
            mem_percent: 1.0,
            connections: 0,
            open_files: 5,
            num_threads: 2,
            ..Default::default()
        };
        let profile = PermissionProfile::new("notepad.exe", None);

        let assessment = score(&snapshot, Some(&profile));
        assert!(assessment.score < 30.0, "score was {}", assessment.score);
        assert_eq!(assessment.level, RiskLevel::Safe);
    }

    #[test]
    fn test_typosquat_burst_process_is_high_risk() {
        let snapshot = ProcessSnapshot {
            name: "svch0st.exe".to_string(),
            pid: 5678,
            command_line: String::new(),
            user_context: "System".to_string(),
            cpu_percent: 85.0,
            mem_percent: 55.0,
            connections: 75,
            open_files: 100,
            num_threads: 150,
            ..Default::default()
        };
        let profile = PermissionProfile::new("svch0st.exe", None);

        let assessment = score(&snapshot, Some(&profile));
        assert!(assessment.score > 60.0, "score was {}", assessment.score);
        assert!(assessment.level >= RiskLevel::HighRisk);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let snapshot = ProcessSnapshot {
            name: "lsasa.exe".to_string(),
            connections: 30,
            cpu_percent: 90.0,
            ..Default::default()
        };
        let profile = PermissionProfile::new("lsasa.exe", None);

        let a = score(&snapshot, Some(&profile));
        let b = score(&snapshot, Some(&profile));
        assert_eq!(a.score, b.score);
        assert_eq!(a.factors, b.factors);
    }

    #[test]
    fn test_score_clamps_when_weights_exceed_one() {
        let config = ScoringConfig {
            weights: FactorWeights {
                permission_abuse: 1.0,
                hidden_execution: 1.0,
                network_anomalies: 1.0,
                persistence_behavior: 1.0,
                resource_spikes: 1.0,
                masquerading_risk: 1.0,
            },
            ..Default::default()
        };
        let snapshot = ProcessSnapshot {
            name: "svch0st_lsasa.scr".to_string(),
            user_context: "System".to_string(),
            cpu_percent: 99.0,
            mem_percent: 99.0,
            connections: 200,
            open_files: 500,
            num_threads: 500,
            ..Default::default()
        };
        let profile = PermissionProfile::new("svch0st_lsasa.scr", None);

        let assessment = score_with_config(&snapshot, Some(&profile), &config);
        assert_eq!(assessment.score, 100.0);
        assert_eq!(assessment.level, RiskLevel::Critical);
    }

    #[test]
    fn test_factor_severity_clamps_at_hundred() {
        // Three typosquat hits alone would sum past 100.
        let snapshot = ProcessSnapshot {
            name: "svch0st_lsasa_csrsa".to_string(),
            ..Default::default()
        };
        let config = ScoringConfig::default();
        assert_eq!(hidden_execution(&snapshot, &config), 100.0);
    }

    #[test]
    fn test_no_profile_means_no_permission_severity() {
        let snapshot = ProcessSnapshot {
            connections: 500,
            open_files: 500,
            ..snap("ghost.exe")
        };
        let assessment = score(&snapshot, None);
        assert_eq!(assessment.factors.permission_abuse, 0.0);
    }

    #[test]
    fn test_system_process_network_chatter() {
        let config = ScoringConfig::default();

        let quiet = ProcessSnapshot {
            connections: 2,
            ..snap("svchost.exe")
        };
        assert_eq!(network_anomalies(&quiet, &config), 0.0);

        let chatty = ProcessSnapshot {
            connections: 4,
            ..snap("svchost.exe")
        };
        // Clears the >2 system limit but not the volume tiers.
        assert_eq!(network_anomalies(&chatty, &config), 30.0);
    }

    #[test]
    fn test_connection_tiers_accumulate() {
        let config = ScoringConfig::default();
        assert_eq!(network_anomalies(&ProcessSnapshot { connections: 6, ..snap("a.exe") }, &config), 10.0);
        assert_eq!(network_anomalies(&ProcessSnapshot { connections: 25, ..snap("a.exe") }, &config), 30.0);
        assert_eq!(network_anomalies(&ProcessSnapshot { connections: 60, ..snap("a.exe") }, &config), 70.0);
    }

    #[test]
    fn test_system_context_on_user_process() {
        let config = ScoringConfig::default();

        let masquerader = ProcessSnapshot {
            user_context: "NT AUTHORITY\\SYSTEM".to_string(),
            create_time: 2e9,
            ..snap("updater.exe")
        };
        assert_eq!(persistence_behavior(&masquerader, &config), 25.0);

        // Recognized system processes are allowed the system context.
        let legit = ProcessSnapshot {
            user_context: "NT AUTHORITY\\SYSTEM".to_string(),
            create_time: 2e9,
            ..snap("services.exe")
        };
        assert_eq!(persistence_behavior(&legit, &config), 0.0);
    }

    #[test]
    fn test_implausible_create_time_flagged() {
        let config = ScoringConfig::default();
        let spoofed = ProcessSnapshot {
            user_context: "user".to_string(),
            create_time: 12345.0,
            ..snap("app.exe")
        };
        assert_eq!(persistence_behavior(&spoofed, &config), 15.0);
    }

    #[test]
    fn test_masquerade_name_path_mismatch() {
        let config = ScoringConfig::default();

        let honest = ProcessSnapshot {
            executable: "C:\\Program Files\\App\\app.exe".to_string(),
            ..snap("app.exe")
        };
        assert_eq!(masquerading_risk(&honest, &config), 0.0);

        let liar = ProcessSnapshot {
            executable: "C:\\Users\\tmp\\payload.exe".to_string(),
            ..snap("chrome.exe")
        };
        assert_eq!(masquerading_risk(&liar, &config), 35.0);
    }

    #[test]
    fn test_masquerade_risky_extension() {
        let config = ScoringConfig::default();
        let script = ProcessSnapshot {
            executable: "C:\\temp\\invoice.scr".to_string(),
            ..snap("invoice.scr")
        };
        assert_eq!(masquerading_risk(&script, &config), 40.0);
    }

    #[test]
    fn test_alert_message_contents() {
        let snapshot = ProcessSnapshot {
            pid: 9999,
            command_line: "run".to_string(),
            executable: "/usr/bin/malware.exe".to_string(),
            connections: 60,
            create_time: 2e9,
            ..snap("malware.exe")
        };
        let assessment = score(&snapshot, None);
        let message = alert_message(&snapshot, &assessment);

        assert!(message.contains("malware.exe"));
        assert!(message.contains("9999"));
        assert!(message.contains(assessment.level.as_str()));
        assert!(message.contains("network_anomalies"));
    }

    #[test]
    fn test_alert_top_factor_tie_break() {
        let assessment = RiskAssessment {
            score: 50.0,
            level: RiskLevel::Suspicious,
            factors: FactorScores {
                hidden_execution: 40.0,
                masquerading_risk: 40.0,
                ..Default::default()
            },
        };
        assert_eq!(assessment.factors.top().0, RiskFactor::HiddenExecution);
    }
}

//! Risk Types
//!
//! Data structures for the scoring engine. No logic beyond lookups.

use serde::{Deserialize, Serialize};

use crate::logic::config::FactorWeights;

// ============================================================================
// RISK FACTORS
// ============================================================================

/// The six scored behavior dimensions, in declaration order. Declaration
/// order doubles as the tie-break order when picking an alert's top factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskFactor {
    PermissionAbuse,
    HiddenExecution,
    NetworkAnomalies,
    PersistenceBehavior,
    ResourceSpikes,
    MasqueradingRisk,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 6] = [
        RiskFactor::PermissionAbuse,
        RiskFactor::HiddenExecution,
        RiskFactor::NetworkAnomalies,
        RiskFactor::PersistenceBehavior,
        RiskFactor::ResourceSpikes,
        RiskFactor::MasqueradingRisk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFactor::PermissionAbuse => "permission_abuse",
            RiskFactor::HiddenExecution => "hidden_execution",
            RiskFactor::NetworkAnomalies => "network_anomalies",
            RiskFactor::PersistenceBehavior => "persistence_behavior",
            RiskFactor::ResourceSpikes => "resource_spikes",
            RiskFactor::MasqueradingRisk => "masquerading_risk",
        }
    }

    pub fn weight(&self, weights: &FactorWeights) -> f64 {
        match self {
            RiskFactor::PermissionAbuse => weights.permission_abuse,
            RiskFactor::HiddenExecution => weights.hidden_execution,
            RiskFactor::NetworkAnomalies => weights.network_anomalies,
            RiskFactor::PersistenceBehavior => weights.persistence_behavior,
            RiskFactor::ResourceSpikes => weights.resource_spikes,
            RiskFactor::MasqueradingRisk => weights.masquerading_risk,
        }
    }
}

impl std::fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// FACTOR SCORES
// ============================================================================

/// Per-factor severities, each in [0,100].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub permission_abuse: f64,
    pub hidden_execution: f64,
    pub network_anomalies: f64,
    pub persistence_behavior: f64,
    pub resource_spikes: f64,
    pub masquerading_risk: f64,
}

impl FactorScores {
    pub fn get(&self, factor: RiskFactor) -> f64 {
        match factor {
            RiskFactor::PermissionAbuse => self.permission_abuse,
            RiskFactor::HiddenExecution => self.hidden_execution,
            RiskFactor::NetworkAnomalies => self.network_anomalies,
            RiskFactor::PersistenceBehavior => self.persistence_behavior,
            RiskFactor::ResourceSpikes => self.resource_spikes,
            RiskFactor::MasqueradingRisk => self.masquerading_risk,
        }
    }

    /// (factor, severity) pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (RiskFactor, f64)> + '_ {
        RiskFactor::ALL.iter().map(move |&f| (f, self.get(f)))
    }

    /// Highest-severity factor; earlier declaration wins ties.
    pub fn top(&self) -> (RiskFactor, f64) {
        let mut best = (RiskFactor::PermissionAbuse, self.permission_abuse);
        for (factor, severity) in self.iter().skip(1) {
            if severity > best.1 {
                best = (factor, severity);
            }
        }
        best
    }
}

// ============================================================================
// RISK LEVEL
// ============================================================================

/// Ordinal severity classification over four contiguous score bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Safe,
    Suspicious,
    HighRisk,
    Critical,
}

impl RiskLevel {
    /// Classify a score. Bands are [0,30], (30,60], (60,80], (80,100];
    /// anything outside [0,100] falls through to Critical.
    pub fn from_score(score: f64) -> Self {
        if (0.0..=30.0).contains(&score) {
            RiskLevel::Safe
        } else if score <= 60.0 && score > 30.0 {
            RiskLevel::Suspicious
        } else if score <= 80.0 && score > 60.0 {
            RiskLevel::HighRisk
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Suspicious => "SUSPICIOUS",
            RiskLevel::HighRisk => "HIGH_RISK",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Inclusive integer band, for display.
    pub fn range(&self) -> (u8, u8) {
        match self {
            RiskLevel::Safe => (0, 30),
            RiskLevel::Suspicious => (31, 60),
            RiskLevel::HighRisk => (61, 80),
            RiskLevel::Critical => (81, 100),
        }
    }

    pub fn severity_level(&self) -> u8 {
        match self {
            RiskLevel::Safe => 0,
            RiskLevel::Suspicious => 1,
            RiskLevel::HighRisk => 2,
            RiskLevel::Critical => 3,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ASSESSMENT
// ============================================================================

/// Result of scoring one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
    pub factors: FactorScores,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_partition_zero_to_hundred() {
        // Walk [0,100] in fine steps: exactly one level each, never a gap.
        for step in 0..=1000u32 {
            let score = step as f64 / 10.0;
            let level = RiskLevel::from_score(score);
            let expected = if score <= 30.0 {
                RiskLevel::Safe
            } else if score <= 60.0 {
                RiskLevel::Suspicious
            } else if score <= 80.0 {
                RiskLevel::HighRisk
            } else {
                RiskLevel::Critical
            };
            assert_eq!(level, expected, "score {}", score);
        }
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(30.0), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(31.0), RiskLevel::Suspicious);
        assert_eq!(RiskLevel::from_score(60.0), RiskLevel::Suspicious);
        assert_eq!(RiskLevel::from_score(61.0), RiskLevel::HighRisk);
        assert_eq!(RiskLevel::from_score(80.0), RiskLevel::HighRisk);
        assert_eq!(RiskLevel::from_score(81.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(100.0), RiskLevel::Critical);
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(RiskLevel::Safe < RiskLevel::Suspicious);
        assert!(RiskLevel::Suspicious < RiskLevel::HighRisk);
        assert!(RiskLevel::HighRisk < RiskLevel::Critical);
    }

    #[test]
    fn test_top_factor_tie_break_is_declaration_order() {
        let factors = FactorScores {
            permission_abuse: 50.0,
            hidden_execution: 50.0,
            network_anomalies: 50.0,
            ..Default::default()
        };
        assert_eq!(factors.top().0, RiskFactor::PermissionAbuse);

        let factors = FactorScores {
            hidden_execution: 40.0,
            resource_spikes: 40.0,
            ..Default::default()
        };
        assert_eq!(factors.top().0, RiskFactor::HiddenExecution);
    }
}

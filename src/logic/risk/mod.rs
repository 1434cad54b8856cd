//! Risk Scoring
//!
//! Pure, deterministic scoring of process snapshots: six weighted behavior
//! factors, an ordinal classification, and alert rendering. No I/O here.

pub mod engine;
pub mod types;

pub use engine::{alert_message, score, score_with_config};
pub use types::{FactorScores, RiskAssessment, RiskFactor, RiskLevel};

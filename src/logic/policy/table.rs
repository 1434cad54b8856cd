//! Policy Table
//!
//! Ordered rule set with highest-threshold-wins selection. Accepts any rule
//! list; keeps it sorted by descending trigger threshold so the first
//! satisfied rule is always the strictest one.

use super::types::{EnforcementAction, PolicyRule};

// ============================================================================
// TABLE
// ============================================================================

#[derive(Debug, Clone)]
pub struct PolicyTable {
    /// Sorted by descending trigger threshold
    rules: Vec<PolicyRule>,
}

impl PolicyTable {
    /// Build a table from arbitrary rules; ordering is normalized here so
    /// callers never have to care about declaration order.
    pub fn new(mut rules: Vec<PolicyRule>) -> Self {
        rules.sort_by(|a, b| {
            b.trigger_threshold
                .partial_cmp(&a.trigger_threshold)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { rules }
    }

    /// The shipped three-rule table.
    pub fn default_rules() -> Self {
        Self::new(vec![
            PolicyRule {
                name: "Critical Threat Auto-Terminate".to_string(),
                trigger_threshold: 85.0,
                action: EnforcementAction::Terminate,
                reversible: false,
                requires_approval: true,
                description: "Automatically terminate processes flagged as critical threats"
                    .to_string(),
            },
            PolicyRule {
                name: "High Risk Quarantine".to_string(),
                trigger_threshold: 70.0,
                action: EnforcementAction::Quarantine,
                reversible: true,
                requires_approval: false,
                description: "Suspend and block network for high-risk processes".to_string(),
            },
            PolicyRule {
                name: "Suspicious Alert".to_string(),
                trigger_threshold: 50.0,
                action: EnforcementAction::Suspend,
                reversible: true,
                requires_approval: false,
                description: "Suspend suspicious processes pending review".to_string(),
            },
        ])
    }

    /// The rule with the highest threshold the score satisfies, if any.
    pub fn select(&self, score: f64) -> Option<&PolicyRule> {
        self.rules.iter().find(|rule| rule.matches(score))
    }

    /// Lockdown variant: every threshold lowered by `offset`, floored at 0.
    pub fn tightened(&self, offset: f64) -> Self {
        let rules = self
            .rules
            .iter()
            .cloned()
            .map(|mut rule| {
                rule.trigger_threshold = (rule.trigger_threshold - offset).max(0.0);
                rule
            })
            .collect();
        Self::new(rules)
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::default_rules()
    }
}

// ============================================================================
// TESTS
// ============================================================================

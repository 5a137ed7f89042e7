use serde::{Deserialize, Serialize};

use super::policy::RiskPolicy;

pub const DEFAULT_DECAY_POINTS_PER_MONTH: u8 = 2;
pub const DEFAULT_PRIOR_SCORE: u8 = 50;
pub const DEFAULT_INITIAL_SCORE: u8 = 75;

/// Tunables for the scoring engine. One instance is shared by every read and write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub risk_policy: RiskPolicy,
    pub decay_points_per_month: u8,
    /// Starting point for pulse surveys when the employee has no score yet.
    pub default_prior_score: u8,
    /// Score assigned when HR provisions a new employee.
    pub initial_score: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            risk_policy: RiskPolicy::default(),
            decay_points_per_month: DEFAULT_DECAY_POINTS_PER_MONTH,
            default_prior_score: DEFAULT_PRIOR_SCORE,
            initial_score: DEFAULT_INITIAL_SCORE,
        }
    }
}

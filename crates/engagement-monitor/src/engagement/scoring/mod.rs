mod config;
mod decay;
mod policy;
mod rules;

pub use config::{
    ScoringConfig, DEFAULT_DECAY_POINTS_PER_MONTH, DEFAULT_INITIAL_SCORE, DEFAULT_PRIOR_SCORE,
};
pub use decay::{decay_score, months_elapsed};
pub use policy::RiskPolicy;

pub(crate) use rules::round_half_up;

use super::domain::{EngagementScore, RiskTier, SurveyAnswers, SurveyForm};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stateless scorer applying one threshold table and one decay rate everywhere.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Scores a validated survey. Standard surveys stand alone; pulse surveys add a
    /// boost on top of `prior`, falling back to the configured default prior.
    pub fn compute_score(&self, answers: &SurveyAnswers, prior: Option<u8>) -> ScoreOutcome {
        let form = answers.form();
        let (score, prior_used, boost) = match form {
            SurveyForm::Standard => (rules::standard_score(answers), None, None),
            SurveyForm::Pulse => {
                let prior = prior.unwrap_or(self.config.default_prior_score);
                let boost = rules::pulse_boost(answers);
                (rules::pulse_score(prior, boost), Some(prior), Some(boost))
            }
        };

        ScoreOutcome {
            form,
            score,
            risk: self.classify(score),
            prior: prior_used,
            boost,
        }
    }

    pub fn classify(&self, score: u8) -> RiskTier {
        self.config.risk_policy.classify(score)
    }

    pub fn apply_decay(&self, score: u8, scored_at: DateTime<Utc>, now: DateTime<Utc>) -> u8 {
        decay_score(score, scored_at, now, self.config.decay_points_per_month)
    }

    /// The single read boundary: the displayed score is always the decayed latest record.
    pub fn current(&self, record: &EngagementScore, now: DateTime<Utc>) -> CurrentScore {
        let score = self.apply_decay(record.score, record.updated_at, now);
        CurrentScore {
            score,
            risk: self.classify(score),
            stored_score: record.score,
            months_since_update: months_elapsed(record.updated_at, now),
            last_updated: record.updated_at,
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

/// Result of scoring a single survey, kept for audit in API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub form: SurveyForm,
    pub score: u8,
    pub risk: RiskTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<u8>,
}

/// Score as displayed at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrentScore {
    pub score: u8,
    pub risk: RiskTier,
    pub stored_score: u8,
    pub months_since_update: u32,
    pub last_updated: DateTime<Utc>,
}

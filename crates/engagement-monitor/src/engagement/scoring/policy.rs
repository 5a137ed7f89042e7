use serde::{Deserialize, Serialize};

use super::super::domain::RiskTier;

/// Threshold table mapping a score onto a risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskPolicy {
    /// Low at 70 and above, Medium from 40, High below 40.
    #[default]
    Standard,
    /// Low at 80 and above, Medium from 60, High below 60.
    Strict,
}

impl RiskPolicy {
    /// Inclusive lower bounds for the Low and Medium tiers.
    pub const fn thresholds(self) -> (u8, u8) {
        match self {
            Self::Standard => (70, 40),
            Self::Strict => (80, 60),
        }
    }

    pub fn classify(self, score: u8) -> RiskTier {
        let (low_from, medium_from) = self.thresholds();
        if score >= low_from {
            RiskTier::Low
        } else if score >= medium_from {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Strict => "strict",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" | "a" | "70-40" => Some(Self::Standard),
            "strict" | "b" | "80-60" => Some(Self::Strict),
            _ => None,
        }
    }
}

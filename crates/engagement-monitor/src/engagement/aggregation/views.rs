use super::super::domain::{EmployeeId, RiskTier};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Bucket width for trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendGranularity {
    /// Weeks starting on Sunday, labelled by their start date. Used by HR analytics.
    Weekly,
    /// Calendar months, labelled by short month name. Used by the company overview.
    #[default]
    Monthly,
}

impl TrendGranularity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Some(Self::Weekly),
            "monthly" | "month" => Some(Self::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub period_start: NaiveDate,
    pub average_score: u8,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CompanyStats {
    pub total_employees: usize,
    pub avg_engagement: u8,
    pub high_risk_count: usize,
    /// Employees contributing to the average; the rest have no score yet.
    pub scored_employees: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionAverage {
    pub question: usize,
    pub label: String,
    pub average: f64,
    pub responses: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub employee_id: EmployeeId,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub score: Option<u8>,
    pub risk: Option<RiskTier>,
    pub risk_label: &'static str,
}

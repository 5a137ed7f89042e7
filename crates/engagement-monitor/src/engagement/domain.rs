use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for employees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurveyId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreId(pub String);

/// Identity anchor owning surveys and scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_date: Option<NaiveDate>,
}

impl Employee {
    pub fn new(id: EmployeeId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            name: None,
            position: None,
            department: None,
            join_date: None,
        }
    }
}

/// Survey shape, determined by how many questions were answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyForm {
    /// Legacy three-question pulse that boosts the prior score.
    Pulse,
    /// Five-question survey scored on its own.
    Standard,
}

impl SurveyForm {
    pub const fn question_count(self) -> usize {
        match self {
            Self::Pulse => 3,
            Self::Standard => 5,
        }
    }

    pub const fn from_len(len: usize) -> Option<Self> {
        match len {
            3 => Some(Self::Pulse),
            5 => Some(Self::Standard),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pulse => "Pulse",
            Self::Standard => "Standard",
        }
    }
}

/// Lowest and highest Likert answer ("Strongly Disagree" .. "Strongly Agree").
pub const LIKERT_MIN: u8 = 1;
pub const LIKERT_MAX: u8 = 5;

/// Validated Likert answers. Construction guarantees 3 or 5 values in `1..=5`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SurveyAnswers(Vec<u8>);

impl SurveyAnswers {
    pub fn new(answers: Vec<u8>) -> Result<Self, ValidationError> {
        if SurveyForm::from_len(answers.len()).is_none() {
            return Err(ValidationError::AnswerCount(answers.len()));
        }

        if let Some((index, value)) = answers
            .iter()
            .enumerate()
            .find(|(_, value)| !(LIKERT_MIN..=LIKERT_MAX).contains(*value))
        {
            return Err(ValidationError::AnswerOutOfRange {
                question: index + 1,
                value: *value,
            });
        }

        Ok(Self(answers))
    }

    pub fn form(&self) -> SurveyForm {
        if self.0.len() == SurveyForm::Pulse.question_count() {
            SurveyForm::Pulse
        } else {
            SurveyForm::Standard
        }
    }

    pub fn values(&self) -> &[u8] {
        &self.0
    }

    pub fn sum(&self) -> u32 {
        self.0.iter().map(|value| u32::from(*value)).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for SurveyAnswers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Vec::<u8>::deserialize(deserializer)?;
        SurveyAnswers::new(raw).map_err(serde::de::Error::custom)
    }
}

/// One employee's answers at a point in time. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: SurveyId,
    pub employee_id: EmployeeId,
    pub answers: SurveyAnswers,
    pub created_at: DateTime<Utc>,
}

/// Disengagement risk derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Sort key placing the most urgent tier first.
    pub const fn urgency(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// Persisted score record. `updated_at` is the reference point for decay.
///
/// `score` is the displayed value and shrinks when the decay batch runs; `recorded_score`
/// is the value scored at `created_at` and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementScore {
    pub id: ScoreId,
    pub employee_id: EmployeeId,
    pub score: u8,
    pub recorded_score: u8,
    pub risk: RiskTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rejections raised before any scoring happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("surveys must contain 3 or 5 answers, got {0}")]
    AnswerCount(usize),
    #[error("answer to question {question} must be between 1 and 5, got {value}")]
    AnswerOutOfRange { question: usize, value: u8 },
    #[error("email is required")]
    MissingEmail,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
}

pub(crate) fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_ascii_lowercase();
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(ValidationError::InvalidEmail(raw.trim().to_string()))
    }
}

//! Employee engagement scoring, risk classification, decay, and trend aggregation.
//!
//! Survey answers flow through one [`ScoringEngine`] into persisted score records. Every
//! read goes through the same decay boundary, so dashboards, the roster, and the decay
//! batch agree on the displayed score and tier.

pub mod access;
pub mod aggregation;
pub mod domain;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use access::{can_access, Identity, IdentityError, IdentityProvider, Resource, Role};
pub use aggregation::{
    CompanyStats, QuestionAverage, RosterEntry, TrendGranularity, TrendPoint, NO_DATA_LABEL,
};
pub use domain::{
    Employee, EmployeeId, EngagementScore, RiskTier, ScoreId, SurveyAnswers, SurveyForm,
    SurveyId, SurveyResponse, ValidationError,
};
pub use repository::{EngagementRepository, RepositoryError};
pub use router::engagement_router;
pub use scoring::{CurrentScore, RiskPolicy, ScoreOutcome, ScoringConfig, ScoringEngine};
pub use service::{
    DecayRun, EmployeeDetail, EmployeeRegistration, EngagementConfig, EngagementService,
    EngagementServiceError, ImportSummary, ProfileUpdate, ProvisionedEmployee, SurveySubmission,
    TrendScope,
};

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::aggregation::{
    company_stats, compute_breakdown, compute_trend, rank_roster, CompanyStats, EmployeeStanding,
    QuestionAverage, RosterEntry, ScoreSample, TrendGranularity, TrendPoint,
};
use super::domain::{
    normalize_email, Employee, EmployeeId, EngagementScore, ScoreId, SurveyAnswers, SurveyId,
    SurveyResponse, ValidationError,
};
use super::repository::{EngagementRepository, RepositoryError};
use super::scoring::{months_elapsed, CurrentScore, ScoreOutcome, ScoringConfig, ScoringEngine};
use crate::import::ImportedSurvey;

pub const DEFAULT_ROSTER_LIMIT: usize = 10;

/// Settings for the service facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementConfig {
    pub scoring: ScoringConfig,
    pub roster_limit: usize,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            roster_limit: DEFAULT_ROSTER_LIMIT,
        }
    }
}

/// Whose scores feed a trend series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrendScope {
    Company,
    Employee(EmployeeId),
}

/// HR request to provision an employee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRegistration {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub join_date: Option<NaiveDate>,
}

/// HR profile edit, keyed by the email the account was provisioned with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub join_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedEmployee {
    pub employee: Employee,
    pub initial_score: EngagementScore,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveySubmission {
    pub survey: SurveyResponse,
    pub score: EngagementScore,
    pub outcome: ScoreOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreHistoryPoint {
    pub recorded_at: DateTime<Utc>,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeDetail {
    pub employee: Employee,
    pub current: Option<CurrentScore>,
    pub history: Vec<ScoreHistoryPoint>,
    pub breakdown: Vec<QuestionAverage>,
    pub survey_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecayRun {
    pub examined: usize,
    pub decayed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub employees_created: usize,
    pub surveys_imported: usize,
}

/// Service composing the repository and the scoring engine.
pub struct EngagementService<R> {
    repository: Arc<R>,
    engine: Arc<ScoringEngine>,
    roster_limit: usize,
}

impl<R> EngagementService<R>
where
    R: EngagementRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: EngagementConfig) -> Self {
        Self {
            repository,
            engine: Arc::new(ScoringEngine::new(config.scoring)),
            roster_limit: config.roster_limit,
        }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    fn next_id(&self, prefix: &str) -> Result<String, RepositoryError> {
        let id = self.repository.next_sequence()?;
        Ok(format!("{prefix}-{id:06}"))
    }

    fn require_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Employee, EngagementServiceError> {
        self.repository
            .employee(employee_id)?
            .ok_or_else(|| EngagementServiceError::UnknownEmployee(employee_id.clone()))
    }

    fn create_employee(
        &self,
        registration: EmployeeRegistration,
    ) -> Result<Employee, EngagementServiceError> {
        let email = normalize_email(&registration.email)?;
        if self.repository.employee_by_email(&email)?.is_some() {
            return Err(RepositoryError::Conflict.into());
        }

        let employee = Employee {
            id: EmployeeId(self.next_id("emp")?),
            email,
            name: registration.name,
            position: registration.position,
            department: registration.department,
            join_date: registration.join_date,
        };
        Ok(self.repository.insert_employee(employee)?)
    }

    fn store_score(
        &self,
        employee_id: &EmployeeId,
        score: u8,
        at: DateTime<Utc>,
    ) -> Result<EngagementScore, RepositoryError> {
        self.repository.insert_score(EngagementScore {
            id: ScoreId(self.next_id("score")?),
            employee_id: employee_id.clone(),
            score,
            recorded_score: score,
            risk: self.engine.classify(score),
            created_at: at,
            updated_at: at,
        })
    }

    /// Provision an employee together with the configured starting score.
    pub fn register_employee(
        &self,
        registration: EmployeeRegistration,
        now: DateTime<Utc>,
    ) -> Result<ProvisionedEmployee, EngagementServiceError> {
        let employee = self.create_employee(registration)?;
        let initial_score =
            self.store_score(&employee.id, self.engine.config().initial_score, now)?;

        info!(
            employee_id = %employee.id,
            score = initial_score.score,
            "employee provisioned"
        );
        Ok(ProvisionedEmployee {
            employee,
            initial_score,
        })
    }

    /// Update optional profile fields for the employee owning `update.email`.
    pub fn update_profile(
        &self,
        update: ProfileUpdate,
    ) -> Result<Employee, EngagementServiceError> {
        let raw_email = update.email.ok_or(ValidationError::MissingEmail)?;
        let email = normalize_email(&raw_email)?;
        let mut employee = self
            .repository
            .employee_by_email(&email)?
            .ok_or(EngagementServiceError::UnknownEmail(email))?;

        if let Some(name) = update.name {
            employee.name = Some(name);
        }
        if let Some(position) = update.position {
            employee.position = Some(position);
        }
        if let Some(department) = update.department {
            employee.department = Some(department);
        }
        if let Some(join_date) = update.join_date {
            employee.join_date = Some(join_date);
        }

        self.repository.update_employee(employee.clone())?;
        debug!(employee_id = %employee.id, "employee profile updated");
        Ok(employee)
    }

    /// Persist the raw survey, then score it and persist a new score record. The survey is
    /// kept even when the score write fails so it can be recomputed later.
    pub fn submit_survey(
        &self,
        employee_id: &EmployeeId,
        answers: SurveyAnswers,
        now: DateTime<Utc>,
    ) -> Result<SurveySubmission, EngagementServiceError> {
        self.require_employee(employee_id)?;

        let survey = self.repository.insert_survey(SurveyResponse {
            id: SurveyId(self.next_id("srv")?),
            employee_id: employee_id.clone(),
            answers,
            created_at: now,
        })?;

        let prior = self
            .repository
            .latest_score(employee_id)?
            .map(|record| self.engine.current(&record, now).score);
        let outcome = self.engine.compute_score(&survey.answers, prior);

        let score = match self.store_score(employee_id, outcome.score, now) {
            Ok(score) => score,
            Err(err) => {
                warn!(
                    employee_id = %employee_id,
                    survey_id = %survey.id.0,
                    error = %err,
                    "survey stored but score could not be persisted"
                );
                return Err(err.into());
            }
        };

        info!(
            employee_id = %employee_id,
            form = outcome.form.label(),
            score = outcome.score,
            risk = outcome.risk.label(),
            "survey scored"
        );
        Ok(SurveySubmission {
            survey,
            score,
            outcome,
        })
    }

    /// Rebuild the score for the newest survey when no score record covers it yet.
    pub fn recompute_score(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<EngagementScore>, EngagementServiceError> {
        self.require_employee(employee_id)?;

        let Some(survey) = self.repository.surveys(employee_id)?.pop() else {
            return Ok(None);
        };
        let latest = self.repository.latest_score(employee_id)?;
        if latest
            .as_ref()
            .is_some_and(|record| record.created_at >= survey.created_at)
        {
            return Ok(None);
        }

        let prior = latest.map(|record| self.engine.current(&record, survey.created_at).score);
        let outcome = self.engine.compute_score(&survey.answers, prior);
        let score = self.store_score(employee_id, outcome.score, survey.created_at)?;
        info!(employee_id = %employee_id, score = score.score, "score recomputed");
        Ok(Some(score))
    }

    /// Current displayed score, `None` when the employee has no score yet.
    pub fn current_score(
        &self,
        employee_id: &EmployeeId,
        now: DateTime<Utc>,
    ) -> Result<Option<CurrentScore>, EngagementServiceError> {
        self.require_employee(employee_id)?;
        Ok(self
            .repository
            .latest_score(employee_id)?
            .map(|record| self.engine.current(&record, now)))
    }

    pub fn trend(
        &self,
        granularity: TrendGranularity,
        scope: &TrendScope,
    ) -> Result<Vec<TrendPoint>, EngagementServiceError> {
        if let TrendScope::Employee(employee_id) = scope {
            self.require_employee(employee_id)?;
        }

        let samples: Vec<ScoreSample> = self
            .repository
            .scores()?
            .iter()
            .filter(|record| match scope {
                TrendScope::Company => true,
                TrendScope::Employee(employee_id) => &record.employee_id == employee_id,
            })
            .map(ScoreSample::from)
            .collect();

        Ok(compute_trend(&samples, granularity))
    }

    fn standings(&self, now: DateTime<Utc>) -> Result<Vec<EmployeeStanding>, RepositoryError> {
        self.repository
            .employees()?
            .into_iter()
            .map(|employee| {
                let current = self
                    .repository
                    .latest_score(&employee.id)?
                    .map(|record| self.engine.current(&record, now));
                Ok(EmployeeStanding { employee, current })
            })
            .collect()
    }

    pub fn company_stats(
        &self,
        now: DateTime<Utc>,
    ) -> Result<CompanyStats, EngagementServiceError> {
        Ok(company_stats(&self.standings(now)?))
    }

    pub fn roster(&self, now: DateTime<Utc>) -> Result<Vec<RosterEntry>, EngagementServiceError> {
        Ok(rank_roster(self.standings(now)?, self.roster_limit))
    }

    pub fn breakdown(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Vec<QuestionAverage>, EngagementServiceError> {
        self.require_employee(employee_id)?;
        Ok(compute_breakdown(&self.repository.surveys(employee_id)?))
    }

    pub fn employee_detail(
        &self,
        employee_id: &EmployeeId,
        now: DateTime<Utc>,
    ) -> Result<EmployeeDetail, EngagementServiceError> {
        let employee = self.require_employee(employee_id)?;
        let surveys = self.repository.surveys(employee_id)?;
        let current = self
            .repository
            .latest_score(employee_id)?
            .map(|record| self.engine.current(&record, now));

        let mut history: Vec<ScoreHistoryPoint> = self
            .repository
            .scores()?
            .into_iter()
            .filter(|record| &record.employee_id == employee_id)
            .map(|record| ScoreHistoryPoint {
                recorded_at: record.created_at,
                score: record.recorded_score,
            })
            .collect();
        history.sort_by_key(|point| point.recorded_at);

        Ok(EmployeeDetail {
            employee,
            current,
            history,
            breakdown: compute_breakdown(&surveys),
            survey_count: surveys.len(),
        })
    }

    /// Materialize decay into each employee's latest record. Rewriting `updated_at`
    /// keeps later read-time decay from counting the same months twice; `recorded_score`
    /// is left alone so trend buckets and history keep the value scored at the time.
    pub fn apply_decay_batch(
        &self,
        now: DateTime<Utc>,
    ) -> Result<DecayRun, EngagementServiceError> {
        let mut run = DecayRun::default();
        for employee in self.repository.employees()? {
            let Some(mut record) = self.repository.latest_score(&employee.id)? else {
                continue;
            };
            run.examined += 1;

            if months_elapsed(record.updated_at, now) == 0 {
                continue;
            }

            let decayed = self.engine.apply_decay(record.score, record.updated_at, now);
            record.score = decayed;
            record.risk = self.engine.classify(decayed);
            record.updated_at = now;
            self.repository.update_score(record)?;
            run.decayed += 1;
        }

        info!(
            examined = run.examined,
            decayed = run.decayed,
            "decay batch applied"
        );
        Ok(run)
    }

    /// Replay exported surveys in submission order, creating unknown employees on the way.
    pub fn import_surveys(
        &self,
        mut rows: Vec<ImportedSurvey>,
    ) -> Result<ImportSummary, EngagementServiceError> {
        rows.sort_by_key(|row| row.submitted_at);
        let mut summary = ImportSummary::default();

        for row in rows {
            let employee = match self.repository.employee_by_email(&row.email)? {
                Some(employee) => employee,
                None => {
                    summary.employees_created += 1;
                    self.create_employee(EmployeeRegistration {
                        email: row.email,
                        ..EmployeeRegistration::default()
                    })?
                }
            };

            self.submit_survey(&employee.id, row.answers, row.submitted_at)?;
            summary.surveys_imported += 1;
        }

        info!(
            employees_created = summary.employees_created,
            surveys_imported = summary.surveys_imported,
            "survey export imported"
        );
        Ok(summary)
    }
}

/// Error raised by the engagement service.
#[derive(Debug, thiserror::Error)]
pub enum EngagementServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("employee {0} not found")]
    UnknownEmployee(EmployeeId),
    #[error("no employee registered with email {0}")]
    UnknownEmail(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

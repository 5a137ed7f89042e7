use chrono::{DateTime, NaiveDate, Utc};
use engagement_monitor::config::IdentityEntry;
use engagement_monitor::engagement::{
    Employee, EmployeeId, EngagementConfig, EngagementRepository, EngagementScore, Identity,
    IdentityError, IdentityProvider, RepositoryError, SurveyResponse,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engagement: EngagementConfig,
}

#[derive(Default)]
struct Tables {
    sequence: u64,
    employees: HashMap<EmployeeId, Employee>,
    surveys: Vec<SurveyResponse>,
    scores: Vec<EngagementScore>,
}

/// Process-local storage. Data lives as long as the server does.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEngagementRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryEngagementRepository {
    fn with_tables<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self
            .tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        f(&mut guard)
    }
}

impl EngagementRepository for InMemoryEngagementRepository {
    fn next_sequence(&self) -> Result<u64, RepositoryError> {
        self.with_tables(|tables| {
            tables.sequence += 1;
            Ok(tables.sequence)
        })
    }

    fn insert_employee(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        self.with_tables(|tables| {
            let duplicate = tables.employees.contains_key(&employee.id)
                || tables
                    .employees
                    .values()
                    .any(|existing| existing.email == employee.email);
            if duplicate {
                return Err(RepositoryError::Conflict);
            }
            tables.employees.insert(employee.id.clone(), employee.clone());
            Ok(employee)
        })
    }

    fn update_employee(&self, employee: Employee) -> Result<(), RepositoryError> {
        self.with_tables(|tables| match tables.employees.get_mut(&employee.id) {
            Some(existing) => {
                *existing = employee;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        })
    }

    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        self.with_tables(|tables| Ok(tables.employees.get(id).cloned()))
    }

    fn employee_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError> {
        self.with_tables(|tables| {
            Ok(tables
                .employees
                .values()
                .find(|employee| employee.email == email)
                .cloned())
        })
    }

    fn employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        self.with_tables(|tables| {
            let mut employees: Vec<Employee> = tables.employees.values().cloned().collect();
            employees.sort_by(|left, right| left.id.cmp(&right.id));
            Ok(employees)
        })
    }

    fn insert_survey(&self, survey: SurveyResponse) -> Result<SurveyResponse, RepositoryError> {
        self.with_tables(|tables| {
            tables.surveys.push(survey.clone());
            Ok(survey)
        })
    }

    fn surveys(&self, employee_id: &EmployeeId) -> Result<Vec<SurveyResponse>, RepositoryError> {
        self.with_tables(|tables| {
            let mut surveys: Vec<SurveyResponse> = tables
                .surveys
                .iter()
                .filter(|survey| &survey.employee_id == employee_id)
                .cloned()
                .collect();
            surveys.sort_by_key(|survey| survey.created_at);
            Ok(surveys)
        })
    }

    fn insert_score(&self, score: EngagementScore) -> Result<EngagementScore, RepositoryError> {
        self.with_tables(|tables| {
            tables.scores.push(score.clone());
            Ok(score)
        })
    }

    fn update_score(&self, score: EngagementScore) -> Result<(), RepositoryError> {
        self.with_tables(|tables| {
            match tables.scores.iter_mut().find(|existing| existing.id == score.id) {
                Some(existing) => {
                    *existing = score;
                    Ok(())
                }
                None => Err(RepositoryError::NotFound),
            }
        })
    }

    fn latest_score(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<EngagementScore>, RepositoryError> {
        self.with_tables(|tables| {
            Ok(tables
                .scores
                .iter()
                .filter(|score| &score.employee_id == employee_id)
                .max_by_key(|score| score.created_at)
                .cloned())
        })
    }

    fn scores(&self) -> Result<Vec<EngagementScore>, RepositoryError> {
        self.with_tables(|tables| Ok(tables.scores.clone()))
    }
}

/// Bearer tokens seeded from `APP_IDENTITIES`.
#[derive(Debug, Default, Clone)]
pub(crate) struct ConfiguredIdentities {
    tokens: HashMap<String, Identity>,
}

impl ConfiguredIdentities {
    pub(crate) fn from_entries(entries: &[IdentityEntry]) -> Self {
        let tokens = entries
            .iter()
            .map(|entry| (entry.token.clone(), entry.identity.clone()))
            .collect();
        Self { tokens }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl IdentityProvider for ConfiguredIdentities {
    fn resolve(&self, token: &str) -> Result<Option<Identity>, IdentityError> {
        Ok(self.tokens.get(token).cloned())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

/// Last second of `date` in UTC, so everything submitted that day is included.
pub(crate) fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(23, 59, 59)
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now)
}

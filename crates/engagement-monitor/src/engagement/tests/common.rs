use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::engagement::access::{Identity, IdentityError, IdentityProvider, Role};
use crate::engagement::domain::{
    Employee, EmployeeId, EngagementScore, SurveyAnswers, SurveyResponse,
};
use crate::engagement::repository::{EngagementRepository, RepositoryError};
use crate::engagement::service::{
    EmployeeRegistration, EngagementConfig, EngagementService, ProvisionedEmployee,
};
use crate::engagement::engagement_router;

pub(super) const HR_TOKEN: &str = "hr-token";
pub(super) const CRON_SECRET: &str = "nightly-secret";

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn answers(values: &[u8]) -> SurveyAnswers {
    SurveyAnswers::new(values.to_vec()).expect("valid answers")
}

pub(super) fn registration(email: &str) -> EmployeeRegistration {
    EmployeeRegistration {
        email: email.to_string(),
        ..EmployeeRegistration::default()
    }
}

pub(super) fn build_service() -> (EngagementService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = EngagementService::new(repository.clone(), EngagementConfig::default());
    (service, repository)
}

pub(super) fn register(
    service: &EngagementService<MemoryRepository>,
    email: &str,
    when: DateTime<Utc>,
) -> ProvisionedEmployee {
    service
        .register_employee(registration(email), when)
        .expect("registration succeeds")
}

/// Employee record without any score, as left behind by an external signup.
pub(super) fn insert_unscored(repository: &MemoryRepository, id: &str, email: &str) -> EmployeeId {
    let employee = Employee::new(EmployeeId(id.to_string()), email);
    repository
        .insert_employee(employee)
        .expect("insert succeeds")
        .id
}

#[derive(Default)]
struct MemoryState {
    employees: BTreeMap<EmployeeId, Employee>,
    surveys: Vec<SurveyResponse>,
    scores: Vec<EngagementScore>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
    sequence: Arc<AtomicU64>,
    fail_score_writes: Arc<AtomicBool>,
}

impl MemoryRepository {
    pub(super) fn fail_score_writes(&self, fail: bool) {
        self.fail_score_writes.store(fail, Ordering::SeqCst);
    }

    pub(super) fn score_count(&self) -> usize {
        self.state.lock().expect("repository mutex poisoned").scores.len()
    }

    fn check_score_writes(&self) -> Result<(), RepositoryError> {
        if self.fail_score_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("score table locked".to_string()));
        }
        Ok(())
    }
}

impl EngagementRepository for MemoryRepository {
    fn next_sequence(&self) -> Result<u64, RepositoryError> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn insert_employee(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        let taken = guard.employees.contains_key(&employee.id)
            || guard
                .employees
                .values()
                .any(|existing| existing.email == employee.email);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.employees.insert(employee.id.clone(), employee.clone());
        Ok(employee)
    }

    fn update_employee(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        match guard.employees.get_mut(&employee.id) {
            Some(existing) => {
                *existing = employee;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard.employees.get(id).cloned())
    }

    fn employee_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard
            .employees
            .values()
            .find(|employee| employee.email == email)
            .cloned())
    }

    fn employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard.employees.values().cloned().collect())
    }

    fn insert_survey(&self, survey: SurveyResponse) -> Result<SurveyResponse, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        guard.surveys.push(survey.clone());
        Ok(survey)
    }

    fn surveys(&self, employee_id: &EmployeeId) -> Result<Vec<SurveyResponse>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        let mut surveys: Vec<SurveyResponse> = guard
            .surveys
            .iter()
            .filter(|survey| &survey.employee_id == employee_id)
            .cloned()
            .collect();
        surveys.sort_by_key(|survey| survey.created_at);
        Ok(surveys)
    }

    fn insert_score(&self, score: EngagementScore) -> Result<EngagementScore, RepositoryError> {
        self.check_score_writes()?;
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        guard.scores.push(score.clone());
        Ok(score)
    }

    fn update_score(&self, score: EngagementScore) -> Result<(), RepositoryError> {
        self.check_score_writes()?;
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        match guard.scores.iter_mut().find(|existing| existing.id == score.id) {
            Some(existing) => {
                *existing = score;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn latest_score(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<EngagementScore>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard
            .scores
            .iter()
            .filter(|score| &score.employee_id == employee_id)
            .max_by_key(|score| score.created_at)
            .cloned())
    }

    fn scores(&self) -> Result<Vec<EngagementScore>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard.scores.clone())
    }
}

pub(super) struct UnavailableRepository;

impl EngagementRepository for UnavailableRepository {
    fn next_sequence(&self) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_employee(&self, _employee: Employee) -> Result<Employee, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_employee(&self, _employee: Employee) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn employee(&self, _id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn employee_by_email(&self, _email: &str) -> Result<Option<Employee>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_survey(&self, _survey: SurveyResponse) -> Result<SurveyResponse, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn surveys(&self, _employee_id: &EmployeeId) -> Result<Vec<SurveyResponse>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_score(&self, _score: EngagementScore) -> Result<EngagementScore, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_score(&self, _score: EngagementScore) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn latest_score(
        &self,
        _employee_id: &EmployeeId,
    ) -> Result<Option<EngagementScore>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn scores(&self) -> Result<Vec<EngagementScore>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct StaticIdentities {
    identities: HashMap<String, Identity>,
}

impl StaticIdentities {
    pub(super) fn with_hr() -> Self {
        let mut identities = Self::default();
        identities.identities.insert(
            HR_TOKEN.to_string(),
            Identity {
                role: Role::Hr,
                employee_id: None,
            },
        );
        identities
    }

    pub(super) fn add_employee(&mut self, token: &str, employee_id: &EmployeeId) {
        self.identities.insert(
            token.to_string(),
            Identity {
                role: Role::Employee,
                employee_id: Some(employee_id.clone()),
            },
        );
    }
}

impl IdentityProvider for StaticIdentities {
    fn resolve(&self, token: &str) -> Result<Option<Identity>, IdentityError> {
        Ok(self.identities.get(token).cloned())
    }
}

pub(super) struct OfflineIdentities;

impl IdentityProvider for OfflineIdentities {
    fn resolve(&self, _token: &str) -> Result<Option<Identity>, IdentityError> {
        Err(IdentityError::Unavailable("session store offline".to_string()))
    }
}

pub(super) fn router_with(
    service: EngagementService<MemoryRepository>,
    identities: StaticIdentities,
    cron_secret: Option<&str>,
) -> axum::Router {
    engagement_router(
        Arc::new(service),
        Arc::new(identities),
        cron_secret.map(str::to_string),
    )
}

pub(super) fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<axum::body::Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            axum::body::Body::from(serde_json::to_vec(&value).expect("serialize body"))
        }
        None => axum::body::Body::empty(),
    };
    builder.body(body).expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

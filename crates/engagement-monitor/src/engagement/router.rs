use std::fmt::Display;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::access::{Identity, IdentityProvider, Resource};
use super::aggregation::{TrendGranularity, NO_DATA_LABEL};
use super::domain::{EmployeeId, SurveyAnswers, ValidationError};
use super::repository::{EngagementRepository, RepositoryError};
use super::service::{
    EmployeeRegistration, EngagementService, EngagementServiceError, ProfileUpdate, TrendScope,
};

/// Header carrying the shared secret for scheduled jobs.
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Shared handler state. Cloned per request, so everything sits behind `Arc`.
pub struct EngagementState<R, I> {
    service: Arc<EngagementService<R>>,
    identities: Arc<I>,
    cron_secret: Option<Arc<str>>,
}

impl<R, I> EngagementState<R, I> {
    pub fn new(
        service: Arc<EngagementService<R>>,
        identities: Arc<I>,
        cron_secret: Option<String>,
    ) -> Self {
        Self {
            service,
            identities,
            cron_secret: cron_secret
                .filter(|secret| !secret.is_empty())
                .map(Arc::from),
        }
    }
}

impl<R, I> Clone for EngagementState<R, I> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            identities: Arc::clone(&self.identities),
            cron_secret: self.cron_secret.clone(),
        }
    }
}

/// Router builder exposing survey intake, dashboards, administration, and the decay job.
pub fn engagement_router<R, I>(
    service: Arc<EngagementService<R>>,
    identities: Arc<I>,
    cron_secret: Option<String>,
) -> Router
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    Router::new()
        .route("/api/v1/surveys", post(submit_survey_handler::<R, I>))
        .route(
            "/api/v1/employees",
            get(roster_handler::<R, I>).post(register_handler::<R, I>),
        )
        .route("/api/v1/employees/profile", put(profile_handler::<R, I>))
        .route("/api/v1/employees/:employee_id", get(detail_handler::<R, I>))
        .route(
            "/api/v1/employees/:employee_id/score",
            get(score_handler::<R, I>),
        )
        .route(
            "/api/v1/employees/:employee_id/breakdown",
            get(breakdown_handler::<R, I>),
        )
        .route(
            "/api/v1/employees/:employee_id/recompute",
            post(recompute_handler::<R, I>),
        )
        .route("/api/v1/trend", get(trend_handler::<R, I>))
        .route("/api/v1/stats", get(stats_handler::<R, I>))
        .route("/api/v1/cron/decay", post(decay_handler::<R, I>))
        .with_state(EngagementState::new(service, identities, cron_secret))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurveyRequest {
    pub employee_id: String,
    pub answers: Vec<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendQuery {
    #[serde(default)]
    pub granularity: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
}

fn error_response(status: StatusCode, message: impl Display) -> Response {
    let payload = json!({
        "error": message.to_string(),
    });
    (status, Json(payload)).into_response()
}

pub(crate) fn service_error_response(error: EngagementServiceError) -> Response {
    let status = match &error {
        EngagementServiceError::Validation(ValidationError::MissingEmail) => {
            StatusCode::BAD_REQUEST
        }
        EngagementServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngagementServiceError::UnknownEmployee(_)
        | EngagementServiceError::UnknownEmail(_)
        | EngagementServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        EngagementServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        EngagementServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!(error = %error, "engagement request failed");
    }
    error_response(status, error)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the caller and apply the access rules for `resource`.
pub(crate) fn authorize<I>(
    identities: &I,
    headers: &HeaderMap,
    resource: Resource<'_>,
) -> Result<Identity, Response>
where
    I: IdentityProvider + ?Sized,
{
    let Some(token) = bearer_token(headers) else {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "missing bearer token",
        ));
    };

    let identity = match identities.resolve(token) {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "unknown credentials",
            ))
        }
        Err(err) => {
            warn!(error = %err, "identity lookup failed");
            return Err(error_response(StatusCode::SERVICE_UNAVAILABLE, err));
        }
    };

    if identity.can_access(resource) {
        Ok(identity)
    } else {
        Err(error_response(StatusCode::FORBIDDEN, "access denied"))
    }
}

pub(crate) async fn submit_survey_handler<R, I>(
    State(state): State<EngagementState<R, I>>,
    headers: HeaderMap,
    Json(request): Json<SurveyRequest>,
) -> Response
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    let employee_id = EmployeeId(request.employee_id);
    if let Err(response) = authorize(
        state.identities.as_ref(),
        &headers,
        Resource::SurveySubmission(&employee_id),
    ) {
        return response;
    }

    let answers = match SurveyAnswers::new(request.answers) {
        Ok(answers) => answers,
        Err(err) => return service_error_response(err.into()),
    };

    match state.service.submit_survey(&employee_id, answers, Utc::now()) {
        Ok(submission) => (StatusCode::CREATED, Json(submission)).into_response(),
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn score_handler<R, I>(
    State(state): State<EngagementState<R, I>>,
    headers: HeaderMap,
    Path(employee_id): Path<String>,
) -> Response
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    let employee_id = EmployeeId(employee_id);
    if let Err(response) = authorize(
        state.identities.as_ref(),
        &headers,
        Resource::EmployeeDetail(&employee_id),
    ) {
        return response;
    }

    match state.service.current_score(&employee_id, Utc::now()) {
        Ok(Some(current)) => {
            let payload = json!({
                "employee_id": employee_id.0,
                "status": "scored",
                "score": current.score,
                "risk": current.risk,
                "risk_label": current.risk.label(),
                "stored_score": current.stored_score,
                "months_since_update": current.months_since_update,
                "last_updated": current.last_updated,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Ok(None) => {
            let payload = json!({
                "employee_id": employee_id.0,
                "status": "no_data",
                "score": serde_json::Value::Null,
                "risk": serde_json::Value::Null,
                "risk_label": NO_DATA_LABEL,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn trend_handler<R, I>(
    State(state): State<EngagementState<R, I>>,
    headers: HeaderMap,
    Query(query): Query<TrendQuery>,
) -> Response
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    let scope = match query.employee_id {
        Some(employee_id) => TrendScope::Employee(EmployeeId(employee_id)),
        None => TrendScope::Company,
    };
    let resource = match &scope {
        TrendScope::Company => Resource::CompanyDashboard,
        TrendScope::Employee(employee_id) => Resource::EmployeeDetail(employee_id),
    };
    if let Err(response) = authorize(state.identities.as_ref(), &headers, resource) {
        return response;
    }

    let granularity = match query.granularity.as_deref() {
        None => TrendGranularity::default(),
        Some(raw) => match TrendGranularity::parse(raw) {
            Some(granularity) => granularity,
            None => {
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("unsupported granularity '{raw}'"),
                )
            }
        },
    };

    match state.service.trend(granularity, &scope) {
        Ok(points) => {
            let payload = json!({
                "granularity": granularity.label(),
                "points": points,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn stats_handler<R, I>(
    State(state): State<EngagementState<R, I>>,
    headers: HeaderMap,
) -> Response
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    if let Err(response) = authorize(
        state.identities.as_ref(),
        &headers,
        Resource::CompanyDashboard,
    ) {
        return response;
    }

    match state.service.company_stats(Utc::now()) {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn breakdown_handler<R, I>(
    State(state): State<EngagementState<R, I>>,
    headers: HeaderMap,
    Path(employee_id): Path<String>,
) -> Response
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    let employee_id = EmployeeId(employee_id);
    if let Err(response) = authorize(
        state.identities.as_ref(),
        &headers,
        Resource::EmployeeDetail(&employee_id),
    ) {
        return response;
    }

    match state.service.breakdown(&employee_id) {
        Ok(questions) => {
            let payload = json!({
                "employee_id": employee_id.0,
                "questions": questions,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn roster_handler<R, I>(
    State(state): State<EngagementState<R, I>>,
    headers: HeaderMap,
) -> Response
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    if let Err(response) = authorize(
        state.identities.as_ref(),
        &headers,
        Resource::EmployeeRoster,
    ) {
        return response;
    }

    match state.service.roster(Utc::now()) {
        Ok(employees) => {
            let payload = json!({
                "employees": employees,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn detail_handler<R, I>(
    State(state): State<EngagementState<R, I>>,
    headers: HeaderMap,
    Path(employee_id): Path<String>,
) -> Response
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    let employee_id = EmployeeId(employee_id);
    if let Err(response) = authorize(
        state.identities.as_ref(),
        &headers,
        Resource::EmployeeDetail(&employee_id),
    ) {
        return response;
    }

    match state.service.employee_detail(&employee_id, Utc::now()) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn register_handler<R, I>(
    State(state): State<EngagementState<R, I>>,
    headers: HeaderMap,
    Json(registration): Json<EmployeeRegistration>,
) -> Response
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    if let Err(response) = authorize(
        state.identities.as_ref(),
        &headers,
        Resource::EmployeeAdmin,
    ) {
        return response;
    }

    match state.service.register_employee(registration, Utc::now()) {
        Ok(provisioned) => (StatusCode::CREATED, Json(provisioned)).into_response(),
        Err(EngagementServiceError::Repository(RepositoryError::Conflict)) => error_response(
            StatusCode::CONFLICT,
            "an employee with this email already exists",
        ),
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn profile_handler<R, I>(
    State(state): State<EngagementState<R, I>>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Response
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    if let Err(response) = authorize(
        state.identities.as_ref(),
        &headers,
        Resource::EmployeeAdmin,
    ) {
        return response;
    }

    match state.service.update_profile(update) {
        Ok(employee) => (StatusCode::OK, Json(employee)).into_response(),
        Err(err) => service_error_response(err),
    }
}

/// Rebuilds a score whose write failed after the survey was stored.
pub(crate) async fn recompute_handler<R, I>(
    State(state): State<EngagementState<R, I>>,
    headers: HeaderMap,
    Path(employee_id): Path<String>,
) -> Response
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    if let Err(response) = authorize(
        state.identities.as_ref(),
        &headers,
        Resource::EmployeeAdmin,
    ) {
        return response;
    }

    let employee_id = EmployeeId(employee_id);
    match state.service.recompute_score(&employee_id) {
        Ok(score) => {
            let payload = json!({
                "employee_id": employee_id.0,
                "recomputed": score.is_some(),
                "score": score,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}

/// Scheduled decay run. Authenticated by shared secret rather than a user identity.
pub(crate) async fn decay_handler<R, I>(
    State(state): State<EngagementState<R, I>>,
    headers: HeaderMap,
) -> Response
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    let Some(secret) = state.cron_secret.as_deref() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "decay job is not configured",
        );
    };

    let provided = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    if provided != Some(secret) {
        return error_response(StatusCode::UNAUTHORIZED, "invalid cron secret");
    }

    match state.service.apply_decay_batch(Utc::now()) {
        Ok(run) => {
            let payload = json!({
                "success": true,
                "examined": run.examined,
                "decayed": run.decayed,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}

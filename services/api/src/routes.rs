use crate::infra::{deserialize_optional_date, AppState};
use crate::report::{build_report, sample_surveys, EngagementReport, ReportDataSource};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use engagement_monitor::engagement::{
    engagement_router, EngagementRepository, EngagementService, IdentityProvider,
    TrendGranularity,
};
use engagement_monitor::error::AppError;
use engagement_monitor::import::SurveyCsvImporter;
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportRequest {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) as_of: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) granularity: Option<TrendGranularity>,
    /// Raw CSV export. Sample data is used when absent.
    #[serde(default)]
    pub(crate) surveys_csv: Option<String>,
}

pub(crate) fn with_engagement_routes<R, I>(
    service: Arc<EngagementService<R>>,
    identities: Arc<I>,
    cron_secret: Option<String>,
) -> axum::Router
where
    R: EngagementRepository + 'static,
    I: IdentityProvider + 'static,
{
    engagement_router(service, identities, cron_secret)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/report", axum::routing::post(report_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Stateless report over a posted export. Stored engagement data is not touched.
pub(crate) async fn report_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ReportRequest>,
) -> Result<Json<EngagementReport>, AppError> {
    let ReportRequest {
        as_of,
        granularity,
        surveys_csv,
    } = payload;

    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
    let (surveys, data_source) = match surveys_csv {
        Some(csv) => (
            SurveyCsvImporter::from_reader(Cursor::new(csv.into_bytes()))?,
            ReportDataSource::SurveyExport,
        ),
        None => (sample_surveys(as_of), ReportDataSource::Sample),
    };

    let report = build_report(
        surveys,
        data_source,
        state.engagement,
        as_of,
        granularity.unwrap_or_default(),
    )?;
    Ok(Json(report))
}

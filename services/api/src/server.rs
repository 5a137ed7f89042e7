use crate::cli::ServeArgs;
use crate::infra::{AppState, ConfiguredIdentities, InMemoryEngagementRepository};
use crate::routes::with_engagement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use engagement_monitor::config::AppConfig;
use engagement_monitor::engagement::EngagementService;
use engagement_monitor::error::AppError;
use engagement_monitor::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        engagement: config.engagement,
    };

    let identities = Arc::new(ConfiguredIdentities::from_entries(&config.auth.identities));
    if identities.is_empty() {
        warn!("APP_IDENTITIES is empty; every authenticated route will answer 401");
    }
    if config.auth.cron_secret.is_none() {
        warn!("CRON_SECRET is not set; the decay job endpoint is disabled");
    }

    let repository = Arc::new(InMemoryEngagementRepository::default());
    let service = Arc::new(EngagementService::new(repository, config.engagement));

    let app = with_engagement_routes(service, identities, config.auth.cron_secret.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        risk_policy = config.engagement.scoring.risk_policy.label(),
        "engagement monitor ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

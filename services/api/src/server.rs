use crate::cli::ServeArgs;
use crate::infra::{load_bureau, load_config_store, load_history, AppState, InMemoryEvaluationRepository};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use risk_gate::config::AppConfig;
use risk_gate::decisioning::RiskDecisionService;
use risk_gate::error::AppError;
use risk_gate::telemetry;
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
    };

    let sources = &config.sources;
    let store = Arc::new(load_config_store(sources.decision_config.as_deref())?);
    let bureau = load_bureau(sources.bureau_fixtures.as_deref())?;
    if sources.bureau_fixtures.is_none() {
        warn!("BUREAU_FIXTURES_PATH not set; every subject will be treated as bureau NOT_FOUND");
    }
    let history = load_history(sources.history_signals.as_deref())?;
    info!(
        config_version = %store.current().version,
        bureau_subjects = bureau.len(),
        history_subjects = history.len(),
        "evidence sources loaded"
    );

    let service = Arc::new(RiskDecisionService::new(
        store,
        Arc::new(InMemoryEvaluationRepository::default()),
        Arc::new(bureau),
        Arc::new(history),
    ));

    let app = with_application_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "risk decisioning service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

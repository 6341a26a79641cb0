use crate::cli::ServeArgs;
use crate::infra::{default_bank_directory, workflow_config, AppState, InMemoryLendingRepository};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loanflow::config::AppConfig;
use loanflow::error::AppError;
use loanflow::telemetry;
use loanflow::workflows::lending::applications::LendingWorkflowService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let repository = Arc::new(InMemoryLendingRepository::default());
    let directory = Arc::new(default_bank_directory());
    let application_service = Arc::new(LendingWorkflowService::new(
        repository,
        directory,
        workflow_config(&config.lending),
    ));

    let app = with_application_routes(application_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan pipeline service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

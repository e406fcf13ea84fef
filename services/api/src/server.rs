use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryResultStore};
use crate::routes::with_wizard_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use mindcare::config::AppConfig;
use mindcare::error::AppError;
use mindcare::telemetry;
use mindcare::workflows::peer_chat::ChatHub;
use mindcare::workflows::wizard::{SystemClock, WizardService};
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

    let store = Arc::new(InMemoryResultStore::default());
    let wizard_service = Arc::new(WizardService::standard(store));
    let chat_hub = Arc::new(ChatHub::new(config.chat, Arc::new(SystemClock)));

    let app = with_wizard_routes(wizard_service, chat_hub)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "mindcare service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_desk_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loan_desk::config::AppConfig;
use loan_desk::error::AppError;
use loan_desk::telemetry;
use loan_desk::workflows::origination::{DecisionDeskService, HttpGateway, RemoteServices};
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
    if let Some(url) = args.gateway_url.take() {
        config.gateway.base_url = url;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let app_state = AppState::new(prometheus_handle);

    let gateway = Arc::new(HttpGateway::new(&config.gateway)?);
    let desk_service = Arc::new(DecisionDeskService::new(RemoteServices::shared(
        gateway.clone(),
    )));

    let app = with_desk_routes(desk_service)
        .layer(Extension(app_state.clone()))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    app_state.mark_ready();

    info!(
        ?config.environment,
        %addr,
        gateway = gateway.base_url(),
        "loan decision desk ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

use std::sync::Arc;

use anyhow::Context;

use stockroom_api::app::{build_app, services};
use stockroom_api::ApiConfig;
use stockroom_infra::InfraConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockroom_observability::init();

    let infra = InfraConfig::from_env().context("invalid persistence configuration")?;
    let api = ApiConfig::from_env().context("invalid listener configuration")?;

    let services = services::build_services(&infra)
        .await
        .context("failed to initialize stores")?;
    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(api.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", api.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

use anyhow::Context as _;

use originstream_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    originstream_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let services = originstream_api::app::services::build_services(&config).await?;
    let app = originstream_api::app::build_app(services.context.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    services.shutdown().await;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

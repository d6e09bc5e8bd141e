use anyhow::Context;

use ledger_api::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ledger_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    tracing::debug!(?config, "configuration loaded");
    let bind_addr = config.bind_addr;

    let app = ledger_api::app::build_app(config)
        .await
        .context("failed to initialise the ledger store")?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

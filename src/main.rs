use anyhow::Context;
use claims_ledger::{config::Config, http, service::LedgerService, store::Store, telemetry};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = Config::from_env().context("invalid configuration")?;
    let db = sled::open(&config.db_path).with_context(|| {
        format!(
            "failed to open ledger store at {}",
            config.db_path.display()
        )
    })?;
    let db = Arc::new(db);

    let store = Store::new(db.clone()).sync_commits(config.sync_commits);
    let app = http::router(Arc::new(LedgerService::from_store(store)));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(
        addr = %config.bind,
        db_path = %config.db_path.display(),
        sync_commits = config.sync_commits,
        "claims ledger listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated")?;

    db.flush_async().await.context("final flush failed")?;
    tracing::info!("claims ledger stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

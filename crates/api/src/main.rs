use std::sync::Arc;

use anyhow::Context;

use warden_api::app::{self, AppServices};
use warden_api::config::AppConfig;
use warden_infra::seed::SeedOutcome;
use warden_infra::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal outside development.
    let _ = dotenvy::dotenv();
    warden_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    // Lazy: the listener comes up even if the database is unreachable.
    let store = Store::connect_lazy(&config.store).context("invalid store configuration")?;
    let services = Arc::new(AppServices::new(store.clone(), &config));
    let router = app::build_app(services.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    let admin_password = config.admin_password.clone();
    tokio::spawn(async move {
        tracing::info!("initializing database");
        match services.initialize(&admin_password).await {
            Ok(SeedOutcome::Applied { inserted }) => tracing::info!(inserted, "database initialized"),
            Ok(SeedOutcome::Skipped { error }) => {
                tracing::warn!(error = %error, "database initialized without default data")
            }
            // Keep serving: /health reports the store as unavailable.
            Err(e) => tracing::error!(error = %e, "database initialization failed"),
        }
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutting down; closing store");
    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

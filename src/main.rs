use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use asset_vault::config::AppConfig;
use asset_vault::database::DatabaseManager;
use asset_vault::routes::{app, AppState};
use asset_vault::services::CatalogueService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECRET_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("asset_vault=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();
    config.validate().context("invalid configuration")?;
    info!("Starting Asset Vault in {:?} mode", config.environment);

    let db = DatabaseManager::connect(&config.database)
        .await
        .context("failed to open database")?;

    let catalogue = CatalogueService::from_config(&config, &db).context("failed to build catalogue service")?;
    catalogue
        .files()
        .init()
        .await
        .context("failed to prepare upload directory")?;
    if config.demo.enabled {
        info!("Demo login enabled for '{}'", config.demo.username);
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(config, db.clone(), catalogue);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Asset Vault listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

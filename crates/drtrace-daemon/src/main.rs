//! DrTrace daemon entry point.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drtrace_daemon::config::DaemonConfig;
use drtrace_daemon::retention;
use drtrace_daemon::routes::{self, AppState};
use drtrace_daemon::store::LogStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drtrace_daemon=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DaemonConfig::from_env();

    let store = Arc::new(LogStore::open(&config.db_path).await?);
    tracing::info!("log store ready at {}", config.db_path.display());

    // Background retention sweep
    retention::spawn(
        Arc::clone(&store),
        config.retention_days,
        retention::SWEEP_PERIOD,
    );

    let addr = format!("{}:{}", config.host, config.port);
    let app = routes::router(AppState::new(store, config));

    tracing::info!("drtrace daemon listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Tabletop battle API server entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tabletop_api::config::AppConfig;
use tabletop_api::error::AppError;
use tabletop_api::state::AppState;
use tabletop_api::{build_router, telemetry};
use tabletop_core::clock::SystemClock;
use tabletop_store::pg_snapshot_repository::PgSnapshotRepository;
use tracing::info;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let _telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    info!("Starting tabletop battle API server");

    // Create database connection pool and bring the schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let app_state = AppState::new(
        Arc::new(SystemClock),
        Arc::new(PgSnapshotRepository::new(pool)),
    );
    let app = build_router(app_state);

    let addr = config.bind_addr()?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

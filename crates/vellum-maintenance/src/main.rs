//! Vellum maintenance entry point.

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use vellum_maintenance::config::MaintenanceConfig;
use vellum_maintenance::error::AppError;
use vellum_maintenance::maintenance;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Vellum maintenance");

    let config = MaintenanceConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    let report = maintenance::run(&pool, &vellum_catalog::registry()).await?;
    tracing::info!(
        indexes = report.indexes,
        entity_types = report.counts.len(),
        "Maintenance complete"
    );

    pool.close().await;
    Ok(())
}

use anyhow::Result;
use sqlx::PgPool;
use tracing::{error, info};

/// Apply the registry schema. Safe to run on every start; applied
/// migrations are recorded in `_sqlx_migrations` and skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");
    sqlx::migrate!("../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            anyhow::anyhow!("Migration failed: {e}")
        })?;
    info!("Migrations completed");
    Ok(())
}

//! Database initialization

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::{error, info};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.dbname)
}

/// Open the bounded connection pool shared by every connection handler.
///
/// Migrations are run separately by the master binary.
pub async fn init_database(config: &DatabaseConfig) -> Result<PgPool> {
    info!(target_db = %config.display_target(), "Connecting to database");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout())
        .connect_with(connect_options(config))
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            Error::StoreUnavailable(format!(
                "database connection to {} failed: {e}",
                config.display_target()
            ))
        })?;

    info!("Database connected successfully");
    Ok(pool)
}

mod error;
pub mod models;
pub mod repositories;

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;

pub use error::{DatabaseError, DbResult};
pub use models::*;
pub use repositories::{EventRepository, MemoryEventRepository, PgEventRepository};

/// Initialize the database connection pool and run migrations
pub async fn init_pool(url: &str, config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections.unwrap_or(10))
        .min_connections(config.database.min_connections.unwrap_or(1))
        .connect(url)
        .await
        .context("Failed to connect to the database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(DatabaseError::from)
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Pick the repository backend from configuration: Postgres when a database
/// URL is set, otherwise an in-memory store that lives as long as the process.
pub async fn init_repository(config: &Config) -> Result<Arc<dyn EventRepository>> {
    match &config.database.url {
        Some(url) => {
            let pool = init_pool(url, config).await?;
            info!("Using Postgres repository");
            Ok(Arc::new(PgEventRepository::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set, data will be kept in memory only");
            Ok(Arc::new(MemoryEventRepository::new()))
        }
    }
}

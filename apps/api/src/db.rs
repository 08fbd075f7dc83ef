use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(&config.database_url)
        .context("DATABASE_URL is not a valid PostgreSQL connection string")?;
    let database = config.resolve_database_name(options.get_database());
    let options = options.database(&database);

    info!("Connecting to PostgreSQL database '{database}'...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await
        .with_context(|| format!("Could not connect to database '{database}'"))?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

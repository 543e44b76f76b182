//! Database layer - pool setup, migrations and the account read interface

pub mod reader;

pub use reader::{AccountReader, PostgresAccountReader};

use crate::config::DatabaseConfig;
use crate::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Create a connection pool.
///
/// Every pooled connection gets the configured `statement_timeout`, so all
/// search round-trips share the store's timeout policy.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let timeout_ms = config.statement_timeout_seconds.saturating_mul(1000);

    let pool = PgPoolOptions::new()
        .min_connections(config.pool_min_size)
        .max_connections(config.pool_max_size)
        .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                let set_timeout = format!("SET statement_timeout = {timeout_ms}");
                sqlx::query(&set_timeout).execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await?;

    tracing::debug!(
        max_connections = config.pool_max_size,
        statement_timeout_ms = timeout_ms,
        "Database pool ready"
    );

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

//! Postgres connection pool for the signflow schema.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::DbError;

/// Shared pool handle; the signature engine and the API both clone this.
pub type DbPool = PgPool;

/// Connect and build the pool.  `max_connections` bounds concurrency —
/// remember every signing cascade holds one connection for the whole
/// transaction.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, DbError> {
    info!(max_connections, "connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply pending migrations from the workspace `migrations/` directory,
/// embedded at build time.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    info!("running database migrations");
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

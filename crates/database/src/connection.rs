use crate::error::DbError;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;
use std::time::Duration;

/// Tuning knobs for the connection pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Establishes a connection pool to the PostgreSQL database.
///
/// This function reads `DATABASE_URL` (a `.env` file is honoured when
/// present), creates a pool with the given settings, and returns it. The pool
/// is meant to be created once at startup and handed to `DbRepository::new`.
pub async fn connect(settings: PoolSettings) -> Result<PgPool, DbError> {
    // A missing .env file is fine; the variable may come from the environment.
    dotenvy::dotenv().ok();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_e| DbError::ConnectionConfigError("DATABASE_URL must be set.".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(&database_url)
        .await?;

    tracing::info!(max_connections = settings.max_connections, "Database pool established.");
    Ok(pool)
}

/// Applies the embedded migrations so the schema is up to date.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied.");
    Ok(())
}

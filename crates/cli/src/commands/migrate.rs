//! Database migration commands.
//!
//! Migrations live in `crates/api/migrations/` and are embedded in the
//! binary at compile time.

use std::collections::HashSet;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::migrate::{Migrate, Migrator};
use thiserror::Error;
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("../api/migrations");

/// Errors from the migration commands.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

async fn connect() -> Result<PgPool, MigrationError> {
    let _ = dotenvy::dotenv();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("DATABASE_URL"))?;

    info!("Connecting to database...");
    Ok(PgPool::connect(database_url.expose_secret()).await?)
}

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is unset, the database is unreachable,
/// or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    info!(available = MIGRATOR.iter().count(), "Running migrations...");
    MIGRATOR.run(&pool).await?;

    info!("Migrations complete");
    Ok(())
}

/// Log which migrations are applied and which are pending.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn status() -> Result<(), MigrationError> {
    let pool = connect().await?;
    let mut conn = pool.acquire().await?;

    conn.ensure_migrations_table().await?;
    let applied: HashSet<i64> = conn
        .list_applied_migrations()
        .await?
        .into_iter()
        .map(|m| m.version)
        .collect();

    for migration in MIGRATOR.iter() {
        let state = if applied.contains(&migration.version) {
            "applied"
        } else {
            "pending"
        };
        info!(
            version = migration.version,
            description = %migration.description,
            state,
            "migration"
        );
    }

    Ok(())
}

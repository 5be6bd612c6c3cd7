//! CLI command implementations.

pub mod migrate;
pub mod shopify;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] kartvizit_server::db::RepositoryError),
}

/// Connect to the database named by `KARTVIZIT_DATABASE_URL` (falling back
/// to `DATABASE_URL`).
pub async fn connect() -> Result<PgPool, CommandError> {
    let database_url = std::env::var("KARTVIZIT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("KARTVIZIT_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = kartvizit_server::db::create_pool(&SecretString::from(database_url)).await?;
    Ok(pool)
}

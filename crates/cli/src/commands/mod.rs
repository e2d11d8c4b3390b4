//! Subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use civic_pulse_core::{EmailError, StatusParseError};
use civic_pulse_web::db::{self, RepositoryError};
use civic_pulse_web::services::AuthError;

/// Errors raised by any subcommand.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Missing environment variable: CIVIC_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session store migration error: {0}")]
    SessionStore(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid role: {0}. Valid roles: citizen, admin")]
    InvalidRole(#[from] StatusParseError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Database URL from `CIVIC_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, CliError> {
    dotenvy::dotenv().ok();

    ["CIVIC_DATABASE_URL", "DATABASE_URL"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .map(SecretString::from)
        .ok_or(CliError::MissingDatabaseUrl)
}

/// Connect using the web application's pool settings.
async fn connect() -> Result<PgPool, CliError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&url).await?)
}

//! Database migration command.
//!
//! Applies `crates/web/migrations/` (schema `civic`) and then creates the
//! session table used by `tower-sessions-sqlx-store`.

use tower_sessions_sqlx_store::PostgresStore;

use super::{CliError, connect};

/// Run all migrations.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running schema migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    tracing::info!("Running session store migration...");
    PostgresStore::new(pool)
        .migrate()
        .await
        .map_err(|e| CliError::SessionStore(e.to_string()))?;

    tracing::info!("Migrations complete!");
    Ok(())
}

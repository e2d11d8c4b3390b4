//! User management commands.

use std::sync::Arc;

use civic_pulse_core::{Email, UserRole};
use civic_pulse_web::db::{PgUserStore, UserStore};
use civic_pulse_web::services::AuthService;

use super::{CliError, connect};

/// Create an account with the given role.
///
/// Goes through the same validation as the sign-up form.
///
/// # Errors
///
/// Returns `CliError` for an invalid role, email, name or password, a
/// duplicate email, or a database failure.
pub async fn create(email: &str, name: &str, password: &str, role: &str) -> Result<(), CliError> {
    let role: UserRole = role.parse()?;
    let pool = connect().await?;
    let users = Arc::new(PgUserStore::new(pool));

    let user = AuthService::new(users.clone())
        .register(name, email, password)
        .await?;
    if role != UserRole::Citizen {
        users.set_role(&user.email, role).await?;
    }

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        role
    );
    Ok(())
}

/// Change an existing account's role.
///
/// # Errors
///
/// Returns `CliError` for an invalid role or email, an unknown user, or a
/// database failure.
pub async fn promote(email: &str, role: &str) -> Result<(), CliError> {
    let role: UserRole = role.parse()?;
    let email = Email::parse(email)?;
    let pool = connect().await?;

    let user = PgUserStore::new(pool).set_role(&email, role).await?;
    tracing::info!("Role updated: {} ({}) is now {}", user.name, user.email, user.role);
    Ok(())
}

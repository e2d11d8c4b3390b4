//! Demo data command.
//!
//! Inserts the demo residents, city staff and five sample issues. Accounts
//! that already exist are reused; issues are only added to an empty table.

use civic_pulse_web::db::seed::{demo_emails, seed_demo_data};
use civic_pulse_web::db::{PgIssueStore, PgUserStore};
use civic_pulse_web::services::auth::hash_password;

use super::{CliError, connect};

/// Seed the database.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or an insert fails.
pub async fn run(password: &str) -> Result<(), CliError> {
    let pool = connect().await?;
    let users = PgUserStore::new(pool.clone());
    let issues = PgIssueStore::new(pool);

    let password_hash = hash_password(password)?;
    let summary = seed_demo_data(&users, &issues, &password_hash).await?;

    tracing::info!("Seeding complete!");
    tracing::info!("  Users created: {}", summary.users_created);
    tracing::info!("  Users already present: {}", summary.users_existing);
    tracing::info!("  Issues created: {}", summary.issues_created);
    if summary.users_created > 0 {
        tracing::info!("  New accounts sign in with the given password:");
        for email in demo_emails() {
            tracing::info!("    {email}");
        }
    }
    Ok(())
}

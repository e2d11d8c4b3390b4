//! Persistence for users, profiles and issues.
//!
//! # Database: `civic`
//!
//! ## Tables
//!
//! - `civic.user` - Sign-in identities (email + argon2 password hash)
//! - `civic.profile` - Display name and role per user
//! - `civic.issue` - Reported issues with location, status and assignee
//! - `civic.issue_upvote` - One row per (issue, user) upvote
//! - `civic.issue_comment` - Append-only comments
//! - `tower_sessions.session` - Session storage (managed by the store itself)
//!
//! # Stores
//!
//! Handlers never talk to `PostgreSQL` directly. They go through the
//! [`UserStore`] and [`IssueStore`] traits, implemented by the `Pg*` types in
//! [`users`] and [`issues`] and by the in-memory doubles in [`memory`].
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p civic-pulse-cli -- migrate
//! ```

pub mod issues;
pub mod memory;
pub mod seed;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use civic_pulse_core::{
    Comment, Email, Issue, IssueId, IssueStatus, NewComment, NewIssue, Profile, User, UserId,
    UserRole,
};

pub use issues::PgIssueStore;
pub use memory::{MemoryIssueStore, MemoryUserStore};
pub use users::PgUserStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store could not be reached or refused the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(format!("{what} already exists"));
        }
    }
    RepositoryError::Database(e)
}

/// Stored credentials for a sign-in attempt.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: UserId,
    pub email: Email,
    pub password_hash: String,
}

/// Identity service plus profile lookup.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an identity and its profile (role citizen).
    ///
    /// Fails with [`RepositoryError::Conflict`] when the email is taken.
    async fn create_user(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    async fn find_credentials(&self, email: &Email) -> Result<Option<Credentials>, RepositoryError>;

    async fn get_profile(&self, id: UserId) -> Result<Option<Profile>, RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Every user, ordered by name.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// All users with the given role, ordered by name.
    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>, RepositoryError>;

    async fn set_role(&self, email: &Email, role: UserRole) -> Result<User, RepositoryError>;
}

/// Record store for issues, upvotes and comments.
///
/// `list` returns issues in insertion order (ascending id).
#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn insert(&self, issue: NewIssue) -> Result<Issue, RepositoryError>;

    async fn list(&self) -> Result<Vec<Issue>, RepositoryError>;

    async fn get(&self, id: IssueId) -> Result<Option<Issue>, RepositoryError>;

    async fn set_status(&self, id: IssueId, status: IssueStatus) -> Result<Issue, RepositoryError>;

    async fn assign(&self, id: IssueId, assignee: Option<UserId>) -> Result<Issue, RepositoryError>;

    /// Flip the user's upvote; returns whether the user upvotes afterwards.
    async fn toggle_upvote(&self, id: IssueId, user: UserId) -> Result<bool, RepositoryError>;

    async fn add_comment(&self, id: IssueId, comment: NewComment) -> Result<Comment, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

//! Session middleware configuration.

use sqlx::PgPool;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::WebConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "civic_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Session layer backed by `PostgreSQL`.
///
/// The `tower_sessions.session` table is created by `civic-cli migrate`.
#[must_use]
pub fn create_session_layer(pool: &PgPool, config: &WebConfig) -> SessionManagerLayer<PostgresStore> {
    configure(PostgresStore::new(pool.clone()), config)
}

/// Session layer that keeps sessions in process memory.
#[must_use]
pub fn create_memory_session_layer(config: &WebConfig) -> SessionManagerLayer<MemoryStore> {
    configure(MemoryStore::default(), config)
}

fn configure<S: SessionStore>(store: S, config: &WebConfig) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

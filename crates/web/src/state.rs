//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::WebConfig;
use crate::db::{IssueStore, PgIssueStore, PgUserStore, UserStore};
use crate::services::storage::{LocalObjectStorage, ObjectStorage};
use crate::services::{AuthService, IssueService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Handlers reach the stores only through the
/// services built here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    pool: Option<PgPool>,
    users: Arc<dyn UserStore>,
    auth: AuthService,
    issues: IssueService,
}

impl AppState {
    /// State backed by `PostgreSQL` and photos on local disk.
    #[must_use]
    pub fn new(config: WebConfig, pool: PgPool) -> Self {
        let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
        let issues: Arc<dyn IssueStore> = Arc::new(PgIssueStore::new(pool.clone()));
        let storage: Arc<dyn ObjectStorage> =
            Arc::new(LocalObjectStorage::new(config.upload_dir.clone()));
        Self::build(config, Some(pool), users, issues, storage)
    }

    /// State over arbitrary stores, without a database pool.
    #[must_use]
    pub fn from_parts(
        config: WebConfig,
        users: Arc<dyn UserStore>,
        issues: Arc<dyn IssueStore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self::build(config, None, users, issues, storage)
    }

    fn build(
        config: WebConfig,
        pool: Option<PgPool>,
        users: Arc<dyn UserStore>,
        issues: Arc<dyn IssueStore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let auth = AuthService::new(users.clone());
        let issues = IssueService::new(issues, users.clone(), storage);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                users,
                auth,
                issues,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// The database pool, absent with the memory backend.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.inner.users
    }

    #[must_use]
    pub fn auth(&self) -> AuthService {
        self.inner.auth.clone()
    }

    #[must_use]
    pub fn issue_service(&self) -> &IssueService {
        &self.inner.issues
    }
}

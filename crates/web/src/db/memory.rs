//! In-memory stores.
//!
//! Used by the `memory` data backend and by tests. Both stores can be told to
//! fail so callers' error paths can be exercised.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use civic_pulse_core::{
    Comment, CommentId, Email, Issue, IssueId, IssueStatus, NewComment, NewIssue, Profile, User,
    UserId, UserRole,
};

use super::{Credentials, IssueStore, RepositoryError, UserStore};

struct StoredUser {
    id: UserId,
    email: Email,
    password_hash: String,
    profile: Option<Profile>,
}

impl StoredUser {
    fn to_user(&self) -> User {
        let profile = self
            .profile
            .clone()
            .unwrap_or_else(|| Profile::fallback_for(&self.email));
        User {
            id: self.id,
            name: profile.name,
            email: self.email.clone(),
            role: profile.role,
        }
    }
}

/// In-memory identity service and profile table.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<StoredUser>>,
    fail_profiles: AtomicBool,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent profile read (`get_profile`, `get_user`) fail.
    pub fn fail_profile_lookups(&self, fail: bool) {
        self.fail_profiles.store(fail, Ordering::SeqCst);
    }

    /// Drop a user's profile row, leaving the identity in place.
    pub async fn remove_profile(&self, id: UserId) {
        if let Some(user) = self.users.write().await.iter_mut().find(|u| u.id == id) {
            user.profile = None;
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| &u.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let id = UserId::new(i32::try_from(users.len() + 1).map_err(|_| {
            RepositoryError::Unavailable("user id space exhausted".to_owned())
        })?);
        let stored = StoredUser {
            id,
            email: email.clone(),
            password_hash: password_hash.to_owned(),
            profile: Some(Profile {
                name: name.to_owned(),
                role: UserRole::Citizen,
            }),
        };
        let user = stored.to_user();
        users.push(stored);
        Ok(user)
    }

    async fn find_credentials(&self, email: &Email) -> Result<Option<Credentials>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| &u.email == email)
            .map(|u| Credentials {
                user_id: u.id,
                email: u.email.clone(),
                password_hash: u.password_hash.clone(),
            }))
    }

    async fn get_profile(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("profile lookup failed".to_owned()));
        }
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.id == id)
            .and_then(|u| u.profile.clone()))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("profile lookup failed".to_owned()));
        }
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.id == id)
            .map(StoredUser::to_user))
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| &u.email == email)
            .map(StoredUser::to_user))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = self
            .users
            .read()
            .await
            .iter()
            .map(StoredUser::to_user)
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.as_i32().cmp(&b.id.as_i32())));
        Ok(users)
    }

    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>, RepositoryError> {
        let mut users = self.list_users().await?;
        users.retain(|u| u.role == role);
        Ok(users)
    }

    async fn set_role(&self, email: &Email, role: UserRole) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| &u.email == email)
            .ok_or(RepositoryError::NotFound)?;
        let mut profile = user
            .profile
            .clone()
            .unwrap_or_else(|| Profile::fallback_for(&user.email));
        profile.role = role;
        user.profile = Some(profile);
        Ok(user.to_user())
    }
}

/// In-memory record store. Issues are kept in insertion order.
#[derive(Default)]
pub struct MemoryIssueStore {
    issues: RwLock<Vec<Issue>>,
    next_comment_id: AtomicUsize,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryIssueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`RepositoryError::Unavailable`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of write calls received, including failed ones.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn begin_write(&self) -> Result<(), RepositoryError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("record store rejected the write".to_owned()));
        }
        Ok(())
    }

    async fn update<T>(
        &self,
        id: IssueId,
        f: impl FnOnce(&mut Issue) -> T + Send,
    ) -> Result<T, RepositoryError> {
        self.begin_write()?;
        let mut issues = self.issues.write().await;
        let issue = issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(f(issue))
    }
}

fn next_id(counter: usize) -> Result<i32, RepositoryError> {
    i32::try_from(counter + 1)
        .map_err(|_| RepositoryError::Unavailable("id space exhausted".to_owned()))
}

#[async_trait]
impl IssueStore for MemoryIssueStore {
    async fn insert(&self, issue: NewIssue) -> Result<Issue, RepositoryError> {
        self.begin_write()?;
        let mut issues = self.issues.write().await;
        let id = IssueId::new(next_id(issues.len())?);
        let issue = Issue::from_new(id, issue, Utc::now());
        issues.push(issue.clone());
        Ok(issue)
    }

    async fn list(&self) -> Result<Vec<Issue>, RepositoryError> {
        Ok(self.issues.read().await.clone())
    }

    async fn get(&self, id: IssueId) -> Result<Option<Issue>, RepositoryError> {
        Ok(self.issues.read().await.iter().find(|i| i.id == id).cloned())
    }

    async fn set_status(&self, id: IssueId, status: IssueStatus) -> Result<Issue, RepositoryError> {
        self.update(id, |issue| {
            issue.status = status;
            issue.clone()
        })
        .await
    }

    async fn assign(&self, id: IssueId, assignee: Option<UserId>) -> Result<Issue, RepositoryError> {
        self.update(id, |issue| {
            issue.assigned_to = assignee;
            issue.clone()
        })
        .await
    }

    async fn toggle_upvote(&self, id: IssueId, user: UserId) -> Result<bool, RepositoryError> {
        self.update(id, |issue| issue.upvotes.toggle(user)).await
    }

    async fn add_comment(&self, id: IssueId, comment: NewComment) -> Result<Comment, RepositoryError> {
        let comment_id = CommentId::new(next_id(self.next_comment_id.fetch_add(1, Ordering::SeqCst))?);
        self.update(id, |issue| {
            let comment = Comment {
                id: comment_id,
                body: comment.body,
                author_id: comment.author_id,
                author_name: comment.author_name,
                created_at: Utc::now(),
            };
            issue.comments.push(comment.clone());
            comment
        })
        .await
    }
}

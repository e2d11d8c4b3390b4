//! Issue lifecycle: submission, filtering, upvotes, comments and triage.
//!
//! Every mutation is a single call to the [`IssueStore`]; the returned value
//! (or error) is what the caller shows. Nothing is cached between requests.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use civic_pulse_core::{
    Comment, CurrentUser, DraftError, Issue, IssueDraft, IssueFilter, IssueId, IssueStatus,
    NewComment, NewIssue, User, UserId,
};

use crate::db::{IssueStore, RepositoryError, UserStore};
use crate::services::storage::{ObjectStorage, StorageError};

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("submission rejected: {}", join_errors(.0))]
    Invalid(Vec<DraftError>),

    #[error("comment must be between 1 and {} characters", NewComment::MAX_CHARS)]
    InvalidComment,

    #[error("issue not found")]
    NotFound,

    #[error("only administrators can do this")]
    Forbidden,

    #[error("assignee does not exist")]
    InvalidAssignee,

    #[error("image upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for IssueError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

fn join_errors(errors: &[DraftError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Clone)]
pub struct IssueService {
    issues: Arc<dyn IssueStore>,
    users: Arc<dyn UserStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl IssueService {
    #[must_use]
    pub fn new(
        issues: Arc<dyn IssueStore>,
        users: Arc<dyn UserStore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            issues,
            users,
            storage,
        }
    }

    /// Validate, upload the optional photo, then create a Pending issue
    /// owned by `author`.
    ///
    /// Nothing remote is touched unless the draft is valid. If the insert
    /// fails after the photo was uploaded, the photo stays in storage.
    ///
    /// # Errors
    ///
    /// `IssueError::Invalid` with every violation, `IssueError::Upload` or
    /// `IssueError::Repository` when a remote call fails.
    pub async fn submit(&self, author: &CurrentUser, draft: IssueDraft) -> Result<Issue, IssueError> {
        draft.validate().map_err(IssueError::Invalid)?;
        let Some(location) = draft.location else {
            return Err(IssueError::Invalid(vec![DraftError::LocationMissing]));
        };

        let uploaded = match draft.image {
            Some(image) => {
                let path = format!("issues/{}.{}", Uuid::new_v4(), image.extension());
                self.storage
                    .upload(&path, &image.data, &image.content_type)
                    .await?;
                Some(path)
            }
            None => None,
        };

        let new_issue = NewIssue {
            title: draft.title.trim().to_owned(),
            description: draft.description.trim().to_owned(),
            image_url: uploaded.as_deref().map(|path| self.storage.public_url(path)),
            location,
            created_by: author.id,
        };

        match self.issues.insert(new_issue).await {
            Ok(issue) => {
                tracing::info!(issue_id = %issue.id, user_id = %author.id, "Issue reported");
                Ok(issue)
            }
            Err(e) => {
                if let Some(path) = uploaded {
                    tracing::warn!(path, error = %e, "Issue insert failed, uploaded image left orphaned");
                }
                Err(e.into())
            }
        }
    }

    /// The whole working set, in store order.
    ///
    /// # Errors
    ///
    /// Returns `IssueError::Repository` if the store cannot be read.
    pub async fn all(&self) -> Result<Vec<Issue>, IssueError> {
        Ok(self.issues.list().await?)
    }

    /// Issues matching `filter`, in store order.
    ///
    /// # Errors
    ///
    /// Returns `IssueError::Repository` if the store cannot be read.
    pub async fn list(&self, filter: &IssueFilter) -> Result<Vec<Issue>, IssueError> {
        Ok(filter.apply_owned(self.all().await?))
    }

    /// # Errors
    ///
    /// Returns `IssueError::NotFound` for an unknown id.
    pub async fn get(&self, id: IssueId) -> Result<Issue, IssueError> {
        self.issues.get(id).await?.ok_or(IssueError::NotFound)
    }

    /// Flip the user's upvote; returns whether they upvote afterwards.
    ///
    /// # Errors
    ///
    /// Returns `IssueError::NotFound` for an unknown id.
    pub async fn toggle_upvote(&self, id: IssueId, user: &CurrentUser) -> Result<bool, IssueError> {
        let upvoted = self.issues.toggle_upvote(id, user.id).await?;
        tracing::debug!(issue_id = %id, user_id = %user.id, upvoted, "Upvote toggled");
        Ok(upvoted)
    }

    /// # Errors
    ///
    /// Returns `IssueError::InvalidComment` for a blank or overlong body and
    /// `IssueError::NotFound` for an unknown id.
    pub async fn add_comment(
        &self,
        id: IssueId,
        author: &CurrentUser,
        body: &str,
    ) -> Result<Comment, IssueError> {
        let comment = NewComment::new(body, author.id, &author.name).ok_or(IssueError::InvalidComment)?;
        let comment = self.issues.add_comment(id, comment).await?;
        tracing::info!(issue_id = %id, comment_id = %comment.id, "Comment added");
        Ok(comment)
    }

    /// Set any status; there is no transition guard.
    ///
    /// # Errors
    ///
    /// Returns `IssueError::Forbidden` unless `actor` is an admin and
    /// `IssueError::NotFound` for an unknown id.
    pub async fn update_status(
        &self,
        actor: &CurrentUser,
        id: IssueId,
        status: IssueStatus,
    ) -> Result<Issue, IssueError> {
        ensure_admin(actor)?;
        let issue = self.issues.set_status(id, status).await?;
        tracing::info!(issue_id = %id, status = status.slug(), actor = %actor.id, "Issue status updated");
        Ok(issue)
    }

    /// Set or clear the assignee. Any registered user can be assigned.
    ///
    /// # Errors
    ///
    /// Returns `IssueError::Forbidden` unless `actor` is an admin,
    /// `IssueError::InvalidAssignee` if the assignee is unknown, and
    /// `IssueError::NotFound` for an unknown issue.
    pub async fn assign(
        &self,
        actor: &CurrentUser,
        id: IssueId,
        assignee: Option<UserId>,
    ) -> Result<Issue, IssueError> {
        ensure_admin(actor)?;
        if let Some(assignee) = assignee {
            if self.users.get_user(assignee).await?.is_none() {
                return Err(IssueError::InvalidAssignee);
            }
        }
        let issue = self.issues.assign(id, assignee).await?;
        tracing::info!(issue_id = %id, assignee = ?assignee.map(|a| a.as_i32()), actor = %actor.id, "Issue assignment updated");
        Ok(issue)
    }

    /// People an issue can be assigned to, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `IssueError::Repository` if the user store cannot be read.
    pub async fn assignees(&self) -> Result<Vec<User>, IssueError> {
        Ok(self.users.list_users().await?)
    }
}

const fn ensure_admin(actor: &CurrentUser) -> Result<(), IssueError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(IssueError::Forbidden)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use civic_pulse_core::{Email, ImageUpload, IssueStats, Location, StatusSet, UserRole};

    use super::*;
    use crate::db::{MemoryIssueStore, MemoryUserStore};
    use crate::services::storage::MemoryObjectStorage;

    struct Fixture {
        issues: Arc<MemoryIssueStore>,
        users: Arc<MemoryUserStore>,
        storage: Arc<MemoryObjectStorage>,
        service: IssueService,
    }

    fn fixture() -> Fixture {
        let issues = Arc::new(MemoryIssueStore::new());
        let users = Arc::new(MemoryUserStore::new());
        let storage = Arc::new(MemoryObjectStorage::new());
        let service = IssueService::new(issues.clone(), users.clone(), storage.clone());
        Fixture {
            issues,
            users,
            storage,
            service,
        }
    }

    async fn account(users: &MemoryUserStore, name: &str, role: UserRole) -> CurrentUser {
        let email = Email::parse(&format!("{}@example.org", name.to_lowercase())).unwrap();
        users.create_user(&email, name, "hash").await.unwrap();
        users.set_role(&email, role).await.unwrap().into()
    }

    fn draft(title: &str) -> IssueDraft {
        IssueDraft {
            title: title.to_owned(),
            description: "Water pooling across the whole sidewalk".to_owned(),
            image: None,
            location: Some(Location::new(40.72, -74.0, "5th Ave").unwrap()),
        }
    }

    #[tokio::test]
    async fn test_submit_creates_pending_issue_owned_by_author() {
        let f = fixture();
        let citizen = account(&f.users, "Ana", UserRole::Citizen).await;

        let issue = f.service.submit(&citizen, draft("Flooded sidewalk")).await.unwrap();
        assert_eq!(issue.status, IssueStatus::Pending);
        assert_eq!(issue.created_by, citizen.id);
        assert_eq!(issue.image_url, None);
        assert_eq!(f.service.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_uploads_image_first() {
        let f = fixture();
        let citizen = account(&f.users, "Ana", UserRole::Citizen).await;
        let mut with_photo = draft("Flooded sidewalk");
        with_photo.image = Some(ImageUpload {
            file_name: "puddle.jpg".to_owned(),
            content_type: "image/jpeg".to_owned(),
            data: vec![0xFF, 0xD8, 0xFF],
        });

        let issue = f.service.submit(&citizen, with_photo).await.unwrap();
        let url = issue.image_url.unwrap();
        assert!(url.starts_with("/uploads/issues/"));
        assert!(url.ends_with(".jpg"));
        assert_eq!(f.storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_draft_makes_no_remote_calls() {
        let f = fixture();
        let citizen = account(&f.users, "Ana", UserRole::Citizen).await;
        let mut no_location = draft("Flooded sidewalk");
        no_location.location = None;
        no_location.image = Some(ImageUpload {
            file_name: "puddle.png".to_owned(),
            content_type: "image/png".to_owned(),
            data: vec![1],
        });

        let err = f.service.submit(&citizen, no_location).await.unwrap_err();
        assert!(matches!(err, IssueError::Invalid(ref e) if e == &vec![DraftError::LocationMissing]));
        assert!(f.storage.is_empty().await);
        assert_eq!(f.issues.write_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_submission() {
        let f = fixture();
        let citizen = account(&f.users, "Ana", UserRole::Citizen).await;
        f.storage.fail_uploads(true);
        let mut with_photo = draft("Flooded sidewalk");
        with_photo.image = Some(ImageUpload {
            file_name: "puddle.png".to_owned(),
            content_type: "image/png".to_owned(),
            data: vec![1],
        });

        let err = f.service.submit(&citizen, with_photo).await.unwrap_err();
        assert!(matches!(err, IssueError::Upload(_)));
        assert_eq!(f.issues.write_count(), 0);
    }

    #[tokio::test]
    async fn test_insert_failure_leaves_uploaded_image() {
        let f = fixture();
        let citizen = account(&f.users, "Ana", UserRole::Citizen).await;
        f.issues.fail_writes(true);
        let mut with_photo = draft("Flooded sidewalk");
        with_photo.image = Some(ImageUpload {
            file_name: "puddle.png".to_owned(),
            content_type: "image/png".to_owned(),
            data: vec![1],
        });

        let err = f.service.submit(&citizen, with_photo).await.unwrap_err();
        assert!(matches!(err, IssueError::Repository(_)));
        assert_eq!(f.storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_applies_filter() {
        let f = fixture();
        let citizen = account(&f.users, "Ana", UserRole::Citizen).await;
        let admin = account(&f.users, "Root", UserRole::Admin).await;
        f.service.submit(&citizen, draft("Broken Road")).await.unwrap();
        let graffiti = f.service.submit(&citizen, draft("Graffiti wall")).await.unwrap();
        f.service
            .update_status(&admin, graffiti.id, IssueStatus::Resolved)
            .await
            .unwrap();

        let filter = IssueFilter::new(
            "road",
            StatusSet::from_iter([IssueStatus::Pending, IssueStatus::InProgress]),
        );
        let titles: Vec<_> = f
            .service
            .list(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["Broken Road"]);

        let stats = IssueStats::count(&f.service.all().await.unwrap());
        assert_eq!((stats.pending, stats.resolved), (1, 1));
    }

    #[tokio::test]
    async fn test_triage_requires_admin() {
        let f = fixture();
        let citizen = account(&f.users, "Ana", UserRole::Citizen).await;
        let issue = f.service.submit(&citizen, draft("Broken Road")).await.unwrap();

        assert!(matches!(
            f.service
                .update_status(&citizen, issue.id, IssueStatus::Resolved)
                .await,
            Err(IssueError::Forbidden)
        ));
        assert!(matches!(
            f.service.assign(&citizen, issue.id, None).await,
            Err(IssueError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_assign_and_unassign() {
        let f = fixture();
        let citizen = account(&f.users, "Ana", UserRole::Citizen).await;
        let admin = account(&f.users, "Root", UserRole::Admin).await;
        let issue = f.service.submit(&citizen, draft("Broken Road")).await.unwrap();

        let assigned = f.service.assign(&admin, issue.id, Some(admin.id)).await.unwrap();
        assert_eq!(assigned.assigned_to, Some(admin.id));

        let crew = account(&f.users, "Worker", UserRole::Citizen).await;
        let reassigned = f.service.assign(&admin, issue.id, Some(crew.id)).await.unwrap();
        assert_eq!(reassigned.assigned_to, Some(crew.id));

        assert!(matches!(
            f.service.assign(&admin, issue.id, Some(UserId::new(404))).await,
            Err(IssueError::InvalidAssignee)
        ));
        assert_eq!(f.service.get(issue.id).await.unwrap().assigned_to, Some(crew.id));

        let cleared = f.service.assign(&admin, issue.id, None).await.unwrap();
        assert_eq!(cleared.assigned_to, None);

        let names: Vec<String> = f
            .service
            .assignees()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Ana", "Root", "Worker"]);
    }

    #[tokio::test]
    async fn test_status_can_move_backwards() {
        let f = fixture();
        let citizen = account(&f.users, "Ana", UserRole::Citizen).await;
        let admin = account(&f.users, "Root", UserRole::Admin).await;
        let issue = f.service.submit(&citizen, draft("Broken Road")).await.unwrap();

        f.service
            .update_status(&admin, issue.id, IssueStatus::Resolved)
            .await
            .unwrap();
        let reopened = f
            .service
            .update_status(&admin, issue.id, IssueStatus::Pending)
            .await
            .unwrap();
        assert_eq!(reopened.status, IssueStatus::Pending);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_and_state_kept() {
        let f = fixture();
        let citizen = account(&f.users, "Ana", UserRole::Citizen).await;
        let admin = account(&f.users, "Root", UserRole::Admin).await;
        let issue = f.service.submit(&citizen, draft("Broken Road")).await.unwrap();
        f.issues.fail_writes(true);

        assert!(f
            .service
            .update_status(&admin, issue.id, IssueStatus::InProgress)
            .await
            .is_err());
        assert_eq!(
            f.service.get(issue.id).await.unwrap().status,
            IssueStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_upvote_and_comment() {
        let f = fixture();
        let citizen = account(&f.users, "Ana", UserRole::Citizen).await;
        let issue = f.service.submit(&citizen, draft("Broken Road")).await.unwrap();

        assert!(f.service.toggle_upvote(issue.id, &citizen).await.unwrap());
        assert!(!f.service.toggle_upvote(issue.id, &citizen).await.unwrap());

        let comment = f
            .service
            .add_comment(issue.id, &citizen, "Still broken today")
            .await
            .unwrap();
        assert_eq!(comment.author_name, "Ana");
        assert!(matches!(
            f.service.add_comment(issue.id, &citizen, "   ").await,
            Err(IssueError::InvalidComment)
        ));
        assert!(matches!(
            f.service.toggle_upvote(IssueId::new(404), &citizen).await,
            Err(IssueError::NotFound)
        ));
    }
}

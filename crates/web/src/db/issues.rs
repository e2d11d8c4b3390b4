//! `PostgreSQL` issue store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use civic_pulse_core::{
    Comment, CommentId, Issue, IssueId, IssueStatus, Location, NewComment, NewIssue, Upvotes,
    UserId,
};

use super::{IssueStore, RepositoryError};

#[derive(sqlx::FromRow)]
struct IssueRow {
    id: i32,
    title: String,
    description: String,
    image_url: Option<String>,
    latitude: f64,
    longitude: f64,
    address: String,
    status: String,
    created_by: i32,
    created_at: DateTime<Utc>,
    assigned_to: Option<i32>,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i32,
    issue_id: i32,
    body: String,
    author_id: i32,
    author_name: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: CommentId::new(row.id),
            body: row.body,
            author_id: UserId::new(row.author_id),
            author_name: row.author_name,
            created_at: row.created_at,
        }
    }
}

impl IssueRow {
    fn into_issue(self, upvotes: Upvotes, comments: Vec<Comment>) -> Result<Issue, RepositoryError> {
        let location = Location::new(self.latitude, self.longitude, &self.address).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid location for issue {}: {e}", self.id))
        })?;
        let status: IssueStatus = self.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid status for issue {}: {e}", self.id))
        })?;

        Ok(Issue {
            id: IssueId::new(self.id),
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            location,
            status,
            created_by: UserId::new(self.created_by),
            created_at: self.created_at,
            assigned_to: self.assigned_to.map(UserId::new),
            upvotes,
            comments,
        })
    }
}

const SELECT_ISSUE: &str = r"
    SELECT id, title, description, image_url, latitude, longitude, address,
           status::text AS status, created_by, created_at, assigned_to
    FROM civic.issue
";

/// Issue store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgIssueStore {
    pool: PgPool,
}

impl PgIssueStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load upvotes and comments for the given issue rows and assemble issues.
    async fn hydrate(&self, rows: Vec<IssueRow>) -> Result<Vec<Issue>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

        let upvote_rows: Vec<(i32, i32)> = sqlx::query_as(
            r"
            SELECT issue_id, user_id
            FROM civic.issue_upvote
            WHERE issue_id = ANY($1)
            ORDER BY created_at, user_id
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let comment_rows: Vec<CommentRow> = sqlx::query_as(
            r"
            SELECT id, issue_id, body, author_id, author_name, created_at
            FROM civic.issue_comment
            WHERE issue_id = ANY($1)
            ORDER BY created_at, id
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut upvotes: HashMap<i32, Vec<UserId>> = HashMap::new();
        for (issue_id, user_id) in upvote_rows {
            upvotes.entry(issue_id).or_default().push(UserId::new(user_id));
        }
        let mut comments: HashMap<i32, Vec<Comment>> = HashMap::new();
        for row in comment_rows {
            comments.entry(row.issue_id).or_default().push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let id = row.id;
                row.into_issue(
                    upvotes.remove(&id).unwrap_or_default().into(),
                    comments.remove(&id).unwrap_or_default(),
                )
            })
            .collect()
    }

    async fn require(&self, id: IssueId) -> Result<Issue, RepositoryError> {
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl IssueStore for PgIssueStore {
    async fn insert(&self, issue: NewIssue) -> Result<Issue, RepositoryError> {
        let (id, created_at): (i32, DateTime<Utc>) = sqlx::query_as(
            r"
            INSERT INTO civic.issue
                (title, description, image_url, latitude, longitude, address, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, created_at
            ",
        )
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(issue.image_url.as_deref())
        .bind(issue.location.latitude())
        .bind(issue.location.longitude())
        .bind(issue.location.address())
        .bind(issue.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(Issue::from_new(IssueId::new(id), issue, created_at))
    }

    async fn list(&self) -> Result<Vec<Issue>, RepositoryError> {
        let rows: Vec<IssueRow> = sqlx::query_as(&format!("{SELECT_ISSUE} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        self.hydrate(rows).await
    }

    async fn get(&self, id: IssueId) -> Result<Option<Issue>, RepositoryError> {
        let row: Option<IssueRow> = sqlx::query_as(&format!("{SELECT_ISSUE} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn set_status(&self, id: IssueId, status: IssueStatus) -> Result<Issue, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE civic.issue
            SET status = $2::civic.issue_status
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status.slug())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.require(id).await
    }

    async fn assign(&self, id: IssueId, assignee: Option<UserId>) -> Result<Issue, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE civic.issue
            SET assigned_to = $2
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(assignee)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_foreign_key_violation() {
                    return RepositoryError::Conflict("assignee does not exist".to_owned());
                }
            }
            RepositoryError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.require(id).await
    }

    async fn toggle_upvote(&self, id: IssueId, user: UserId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM civic.issue WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let removed = sqlx::query(
            r"
            DELETE FROM civic.issue_upvote
            WHERE issue_id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if removed == 0 {
            sqlx::query(
                r"
                INSERT INTO civic.issue_upvote (issue_id, user_id)
                VALUES ($1, $2)
                ",
            )
            .bind(id)
            .bind(user)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(removed == 0)
    }

    async fn add_comment(&self, id: IssueId, comment: NewComment) -> Result<Comment, RepositoryError> {
        let row: CommentRow = sqlx::query_as(
            r"
            INSERT INTO civic.issue_comment (issue_id, body, author_id, author_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, issue_id, body, author_id, author_name, created_at
            ",
        )
        .bind(id)
        .bind(&comment.body)
        .bind(comment.author_id)
        .bind(&comment.author_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_foreign_key_violation() {
                    return RepositoryError::NotFound;
                }
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }
}

//! Issue detail page, upvotes and comments.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use civic_pulse_core::{Comment, IssueId};

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::{IssueCard, Layout};
use crate::services::IssueError;
use crate::state::AppState;

/// Comment form data.
#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub body: String,
}

/// Issue detail template.
#[derive(Template, WebTemplate)]
#[template(path = "issues/show.html")]
pub struct IssueTemplate {
    pub layout: Layout,
    pub issue: IssueCard,
    pub reporter: String,
    pub comments: Vec<CommentView>,
}

pub struct CommentView {
    pub author_name: String,
    pub body: String,
    pub posted_at: String,
}

impl From<&Comment> for CommentView {
    fn from(comment: &Comment) -> Self {
        Self {
            author_name: comment.author_name.clone(),
            body: comment.body.clone(),
            posted_at: comment.created_at.format("%b %-d, %Y %H:%M").to_string(),
        }
    }
}

fn issue_url(id: IssueId) -> String {
    format!("/issues/{id}")
}

/// Display one issue.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<IssueId>,
) -> Result<impl IntoResponse> {
    let issue = state.issue_service().get(id).await?;
    let people = state.issue_service().assignees().await?;
    let reporter = state
        .users()
        .get_user(issue.created_by)
        .await?
        .map_or_else(|| "Unknown resident".to_owned(), |u| u.name);

    Ok(IssueTemplate {
        issue: IssueCard::new(&issue, user.id, &people),
        reporter,
        comments: issue.comments.iter().map(CommentView::from).collect(),
        layout: Layout::load(&session, Some(user)).await,
    })
}

/// Toggle the caller's upvote and return to the issue.
pub async fn upvote(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<IssueId>,
) -> Result<Response> {
    let upvoted = state.issue_service().toggle_upvote(id, &user).await?;
    let issue_id = id.to_string();
    add_breadcrumb(
        "issue",
        if upvoted { "Upvoted issue" } else { "Removed upvote" },
        Some(&[("issue_id", issue_id.as_str())]),
    );
    Ok(Redirect::to(&issue_url(id)).into_response())
}

/// Append a comment by the caller.
pub async fn comment(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<IssueId>,
    Form(form): Form<CommentForm>,
) -> Result<Response> {
    match state.issue_service().add_comment(id, &user, &form.body).await {
        Ok(_) => Flash::success("Comment added").push(&session).await,
        Err(IssueError::InvalidComment) => {
            Flash::error(IssueError::InvalidComment.to_string())
                .push(&session)
                .await;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to(&format!("{}#comments", issue_url(id))).into_response())
}

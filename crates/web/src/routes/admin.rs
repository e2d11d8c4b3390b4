//! Administrator triage: statistics, filtering, status and assignment.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use civic_pulse_core::{IssueFilter, IssueId, IssueStats, IssueStatus, StatusSet, User, UserId};

use crate::db::UserStore;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::routes::{IssueCard, Layout};
use crate::state::AppState;

/// Admin page query string.
#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    #[serde(default)]
    pub q: String,
    /// `all` or a single status slug.
    #[serde(default)]
    pub status: String,
}

impl AdminQuery {
    /// Unknown status values fall back to showing everything.
    #[must_use]
    pub fn statuses(&self) -> StatusSet {
        StatusSet::from_str(&self.status).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignForm {
    /// Empty to clear the assignee.
    #[serde(default)]
    pub assignee: String,
}

impl AssignForm {
    /// `Ok(None)` clears the assignee; `Err` carries the unparsable value.
    fn assignee(&self) -> std::result::Result<Option<UserId>, &str> {
        let raw = self.assignee.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<UserId>().map(Some).map_err(|_| raw)
    }
}

/// Admin page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub layout: Layout,
    pub stats: IssueStats,
    pub search: String,
    pub status: String,
    pub statuses: &'static [IssueStatus],
    pub issues: Vec<IssueCard>,
    pub assignees: Vec<User>,
}

/// Display statistics and the filtered triage table.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Query(query): Query<AdminQuery>,
) -> Result<impl IntoResponse> {
    let service = state.issue_service();
    let all = service.all().await?;
    let assignees = service.assignees().await?;
    let statuses = query.statuses();
    let filter = IssueFilter::new(query.q.as_str(), statuses);

    let issues = filter
        .apply(&all)
        .into_iter()
        .map(|issue| IssueCard::new(issue, user.id, &assignees))
        .collect();

    Ok(AdminTemplate {
        stats: IssueStats::count(&all),
        layout: Layout::load(&session, Some(user)).await,
        search: query.q,
        status: statuses.to_string(),
        statuses: &IssueStatus::ALL,
        issues,
        assignees,
    })
}

/// Set an issue's status. The outcome is reported as a flash.
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<IssueId>,
    Form(form): Form<StatusForm>,
) -> Response {
    let flash = match IssueStatus::from_str(&form.status) {
        Err(e) => Flash::error(format!("Could not update issue #{id}: {e}")),
        Ok(status) => match state.issue_service().update_status(&user, id, status).await {
            Ok(issue) => Flash::success(format!(
                "Issue #{} status updated to {}",
                issue.id,
                issue.status.label()
            )),
            Err(e) => {
                tracing::warn!(issue_id = %id, error = %e, "Status update failed");
                Flash::error(format!("Failed to update issue #{id} status"))
            }
        },
    };
    flash.push(&session).await;
    Redirect::to("/admin").into_response()
}

/// Display name for the assignment flash; lookup failures fall back to the id.
async fn assignee_name(users: &dyn UserStore, id: UserId) -> String {
    match users.get_user(id).await {
        Ok(Some(user)) => user.name,
        Ok(None) => format!("user #{id}"),
        Err(e) => {
            tracing::warn!(user_id = %id, error = %e, "Failed to look up assignee name");
            format!("user #{id}")
        }
    }
}

/// Set or clear an issue's assignee. The outcome is reported as a flash.
pub async fn assign(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<IssueId>,
    Form(form): Form<AssignForm>,
) -> Response {
    let flash = match form.assignee() {
        Err(raw) => Flash::error(format!("Could not assign issue #{id}: unknown user {raw:?}")),
        Ok(assignee) => match state.issue_service().assign(&user, id, assignee).await {
            Ok(issue) => match issue.assigned_to {
                Some(assignee) => {
                    let name = assignee_name(state.users().as_ref(), assignee).await;
                    Flash::success(format!("Issue #{} assigned to {name}", issue.id))
                }
                None => Flash::success(format!("Issue #{} unassigned", issue.id)),
            },
            Err(e) => {
                tracing::warn!(issue_id = %id, error = %e, "Assignment failed");
                Flash::error(format!("Failed to assign issue #{id}: {e}"))
            }
        },
    };
    flash.push(&session).await;
    Redirect::to("/admin").into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use civic_pulse_core::{CurrentUser, Email, Issue, Location, NewIssue, UserRole};

    use super::*;
    use crate::db::MemoryUserStore;

    fn person(id: i32, name: &str, role: UserRole) -> User {
        User {
            id: UserId::new(id),
            name: name.to_owned(),
            email: Email::parse(&format!("user{id}@civicpulse.test")).unwrap(),
            role,
        }
    }

    #[test]
    fn test_admin_page_marks_current_assignee() {
        let admin = person(7, "City Admin", UserRole::Admin);
        let people = vec![
            person(1, "Jane Doe", UserRole::Citizen),
            person(6, "Park Maintenance", UserRole::Admin),
        ];
        let mut issue = Issue::from_new(
            IssueId::new(5),
            NewIssue {
                title: "Broken Swing in Park".to_owned(),
                description: "One of the swings is broken and unsafe".to_owned(),
                image_url: None,
                location: Location::new(40.725, -74.012, "City Park").unwrap(),
                created_by: UserId::new(1),
            },
            Utc::now(),
        );
        issue.assigned_to = Some(UserId::new(6));
        let all = vec![issue];

        let page = AdminTemplate {
            layout: Layout::without_flash(Some(CurrentUser::from(admin.clone()))),
            stats: IssueStats::count(&all),
            search: String::new(),
            status: StatusSet::default().to_string(),
            statuses: &IssueStatus::ALL,
            issues: all
                .iter()
                .map(|issue| IssueCard::new(issue, admin.id, &people))
                .collect(),
            assignees: people,
        };
        let html = page.render().unwrap();

        assert!(html.contains("Broken Swing in Park"));
        assert!(html.contains(r#"<option value="6" selected>Park Maintenance</option>"#));
        assert!(html.contains(r#"<option value="1">Jane Doe</option>"#));
    }

    #[tokio::test]
    async fn test_assignee_name_falls_back_to_id() {
        let users = MemoryUserStore::new();
        let email = Email::parse("crew@civicpulse.test").unwrap();
        let crew = users.create_user(&email, "Road Crew", "hash").await.unwrap();

        assert_eq!(assignee_name(&users, crew.id).await, "Road Crew");
        assert_eq!(assignee_name(&users, UserId::new(99)).await, "user #99");

        users.fail_profile_lookups(true);
        assert_eq!(assignee_name(&users, crew.id).await, format!("user #{}", crew.id));
    }

    #[test]
    fn test_admin_query_statuses() {
        let query = AdminQuery {
            status: "in_progress".to_owned(),
            ..AdminQuery::default()
        };
        assert_eq!(query.statuses(), StatusSet::only(IssueStatus::InProgress));

        assert!(AdminQuery::default().statuses().is_all());

        let junk = AdminQuery {
            status: "closed".to_owned(),
            ..AdminQuery::default()
        };
        assert!(junk.statuses().is_all());
    }

    #[test]
    fn test_assign_form_parses_assignee() {
        let clear = AssignForm {
            assignee: String::new(),
        };
        assert_eq!(clear.assignee(), Ok(None));

        let set = AssignForm {
            assignee: " 7 ".to_owned(),
        };
        assert_eq!(set.assignee(), Ok(Some(UserId::new(7))));

        let bad = AssignForm {
            assignee: "seven".to_owned(),
        };
        assert_eq!(bad.assignee(), Err("seven"));
    }
}

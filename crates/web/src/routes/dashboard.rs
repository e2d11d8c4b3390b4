//! Citizen dashboard: search and status filter over every issue.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;

use civic_pulse_core::{IssueFilter, IssueStats, IssueStatus, StatusSet};

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::{IssueCard, Layout};
use crate::state::AppState;

/// Dashboard query string.
///
/// The form always sends `filtered=1` with the status checkboxes, so an
/// unchecked box means "exclude". Without `filtered` every status is shown.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub q: String,
    pub filtered: Option<String>,
    pub pending: Option<String>,
    pub in_progress: Option<String>,
    pub resolved: Option<String>,
}

impl DashboardQuery {
    #[must_use]
    pub fn statuses(&self) -> StatusSet {
        if self.filtered.is_none() {
            return StatusSet::all();
        }
        [
            (IssueStatus::Pending, &self.pending),
            (IssueStatus::InProgress, &self.in_progress),
            (IssueStatus::Resolved, &self.resolved),
        ]
        .into_iter()
        .filter(|(_, checked)| checked.is_some())
        .map(|(status, _)| status)
        .collect()
    }

    #[must_use]
    pub fn filter(&self) -> IssueFilter {
        IssueFilter::new(self.q.as_str(), self.statuses())
    }
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub search: String,
    pub show_pending: bool,
    pub show_in_progress: bool,
    pub show_resolved: bool,
    pub issues: Vec<IssueCard>,
    pub stats: IssueStats,
}

/// Display the dashboard.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse> {
    let filter = query.filter();
    let all = state.issue_service().all().await?;
    let people = state.issue_service().assignees().await?;

    let issues = filter
        .apply(&all)
        .into_iter()
        .map(|issue| IssueCard::new(issue, user.id, &people))
        .collect();
    let statuses = filter.statuses;

    Ok(DashboardTemplate {
        stats: IssueStats::count(&all),
        layout: Layout::load(&session, Some(user)).await,
        search: query.q,
        show_pending: statuses.contains(IssueStatus::Pending),
        show_in_progress: statuses.contains(IssueStatus::InProgress),
        show_resolved: statuses.contains(IssueStatus::Resolved),
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfiltered_query_shows_everything() {
        let query = DashboardQuery::default();
        assert!(query.statuses().is_all());
    }

    #[test]
    fn test_checkboxes_select_statuses() {
        let query = DashboardQuery {
            filtered: Some("1".to_owned()),
            pending: Some("on".to_owned()),
            resolved: Some("on".to_owned()),
            ..DashboardQuery::default()
        };
        let statuses = query.statuses();
        assert!(statuses.contains(IssueStatus::Pending));
        assert!(!statuses.contains(IssueStatus::InProgress));
        assert!(statuses.contains(IssueStatus::Resolved));
    }

    #[test]
    fn test_all_boxes_cleared_shows_nothing() {
        let query = DashboardQuery {
            filtered: Some("1".to_owned()),
            ..DashboardQuery::default()
        };
        assert_eq!(query.statuses(), StatusSet::empty());
    }
}

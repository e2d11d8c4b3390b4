//! JSON API consumed by the map view.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use civic_pulse_core::{Issue, IssueFilter, IssueId, IssueStats, StatusSet};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// `GET /api/issues` query string.
#[derive(Debug, Default, Deserialize)]
pub struct IssueQuery {
    #[serde(default)]
    pub q: String,
    /// `all` or a comma-separated list of status slugs.
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct IssueList {
    /// Counts over the whole working set, before filtering.
    pub stats: IssueStats,
    pub issues: Vec<Issue>,
}

/// Filtered issues, in store order.
pub async fn list_issues(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<IssueQuery>,
) -> Result<Json<IssueList>> {
    let statuses = StatusSet::from_str(&query.status)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let filter = IssueFilter::new(query.q, statuses);

    let all = state.issue_service().all().await?;
    let stats = IssueStats::count(&all);
    Ok(Json(IssueList {
        stats,
        issues: filter.apply_owned(all),
    }))
}

/// One issue.
pub async fn get_issue(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<IssueId>,
) -> Result<Json<Issue>> {
    Ok(Json(state.issue_service().get(id).await?))
}

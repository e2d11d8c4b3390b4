//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Landing page
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action (rate limited)
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action (rate limited)
//! POST /auth/logout            - Logout action
//!
//! # Citizens (requires auth)
//! GET  /dashboard              - Search and filter all issues
//! GET  /report                 - Report form
//! POST /report                 - Submit a report (multipart)
//! GET  /issues/{id}            - Issue detail with comments
//! POST /issues/{id}/upvote     - Toggle the caller's upvote
//! POST /issues/{id}/comments   - Add a comment
//!
//! # Admin (requires admin role)
//! GET  /admin                  - Statistics and triage table
//! POST /admin/issues/{id}/status - Set status
//! POST /admin/issues/{id}/assign - Set or clear assignee
//!
//! # JSON API (requires auth)
//! GET  /api/issues             - Filtered issues for the map
//! GET  /api/issues/{id}        - One issue
//! ```

pub mod admin;
pub mod api;
pub mod auth;
pub mod dashboard;
pub mod home;
pub mod issues;
pub mod report;
mod views;

pub use views::{IssueCard, Layout};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::middleware::rate_limit::RateLimiterLayer;
use crate::state::AppState;

/// Largest request body accepted by `POST /report`.
///
/// Above the image limit, so oversized photos reach form validation.
pub const REPORT_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Create the auth routes router. The limiter guards only the POST actions.
pub fn auth_routes(limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let mut router = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register));
    if let Some(limiter) = limiter {
        router = router.route_layer(limiter);
    }

    router
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
}

/// Create the issue routes router.
pub fn issue_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(issues::show))
        .route("/{id}/upvote", post(issues::upvote))
        .route("/{id}/comments", post(issues::comment))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::index))
        .route("/issues/{id}/status", post(admin::update_status))
        .route("/issues/{id}/assign", post(admin::assign))
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/issues", get(api::list_issues))
        .route("/issues/{id}", get(api::get_issue))
}

/// Create all page and API routes.
pub fn routes(limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/dashboard", get(dashboard::index))
        .route(
            "/report",
            get(report::form)
                .post(report::submit)
                .layer(DefaultBodyLimit::max(REPORT_BODY_LIMIT)),
        )
        .nest("/auth", auth_routes(limiter))
        .nest("/issues", issue_routes())
        .nest("/admin", admin_routes())
        .nest("/api", api_routes())
}

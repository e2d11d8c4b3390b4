//! Administrator triage: gating, status changes and assignment.

use axum::http::StatusCode;

use civic_pulse_core::{IssueStatus, UserId};
use civic_pulse_integration_tests::{
    ADMIN_EMAIL, CITIZEN_EMAIL, DEMO_PASSWORD, TestApp, body_text, location,
};

#[tokio::test]
async fn test_citizen_is_turned_away_from_admin() {
    let app = TestApp::seeded().await;
    let cookie = app.login(CITIZEN_EMAIL, DEMO_PASSWORD).await;

    let response = app.get("/admin", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");

    let html = body_text(app.get("/dashboard", Some(&cookie)).await).await;
    assert!(html.contains("You do not have permission to access the admin panel"));
}

#[tokio::test]
async fn test_citizen_cannot_change_status() {
    let app = TestApp::seeded().await;
    let cookie = app.login(CITIZEN_EMAIL, DEMO_PASSWORD).await;

    let response = app
        .post_form("/admin/issues/1/status", "status=resolved", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/dashboard");
    assert_eq!(app.issue(1).await.status, IssueStatus::Pending);
}

#[tokio::test]
async fn test_admin_page_shows_stats_and_filters() {
    let app = TestApp::seeded().await;
    let cookie = app.login(ADMIN_EMAIL, DEMO_PASSWORD).await;

    let response = app.get("/admin", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<strong>5</strong> total"));
    assert!(html.contains("<strong>2</strong> pending"));
    assert!(html.contains("<strong>1</strong> resolved"));
    assert!(html.contains("Broken Streetlight"));
    assert!(html.contains("Park Maintenance"));
    assert!(html.contains(r#"<option value="1">Jane Doe</option>"#), "citizens are offered as assignees");

    let resolved = body_text(app.get("/admin?status=resolved", Some(&cookie)).await).await;
    assert!(resolved.contains("Overflowing Trash Bin"));
    assert!(!resolved.contains("Broken Streetlight"));
    assert!(resolved.contains("<strong>5</strong> total"), "stats ignore the filter");

    let searched = body_text(app.get("/admin?q=library", Some(&cookie)).await).await;
    assert!(searched.contains("Graffiti on Public Library"));
    assert!(!searched.contains("Pothole on Oak Street"));
}

#[tokio::test]
async fn test_admin_updates_status() {
    let app = TestApp::seeded().await;
    let cookie = app.login(ADMIN_EMAIL, DEMO_PASSWORD).await;

    let response = app
        .post_form("/admin/issues/1/status", "status=in_progress", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");
    assert_eq!(app.issue(1).await.status, IssueStatus::InProgress);

    let html = body_text(app.get("/admin", Some(&cookie)).await).await;
    assert!(html.contains("Issue #1 status updated to In Progress"));
    assert!(html.contains("<strong>1</strong> pending"));

    // Resolved issues can be reopened.
    app.post_form("/admin/issues/3/status", "status=pending", Some(&cookie))
        .await;
    assert_eq!(app.issue(3).await.status, IssueStatus::Pending);
}

#[tokio::test]
async fn test_admin_status_update_rejects_unknown_status() {
    let app = TestApp::seeded().await;
    let cookie = app.login(ADMIN_EMAIL, DEMO_PASSWORD).await;

    app.post_form("/admin/issues/1/status", "status=closed", Some(&cookie))
        .await;
    assert_eq!(app.issue(1).await.status, IssueStatus::Pending);

    let html = body_text(app.get("/admin", Some(&cookie)).await).await;
    assert!(html.contains("Could not update issue #1"));
}

#[tokio::test]
async fn test_admin_status_update_on_missing_issue() {
    let app = TestApp::seeded().await;
    let cookie = app.login(ADMIN_EMAIL, DEMO_PASSWORD).await;

    let response = app
        .post_form("/admin/issues/999/status", "status=resolved", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/admin");

    let html = body_text(app.get("/admin", Some(&cookie)).await).await;
    assert!(html.contains("Failed to update issue #999 status"));
}

#[tokio::test]
async fn test_admin_assigns_and_unassigns() {
    let app = TestApp::seeded().await;
    let cookie = app.login(ADMIN_EMAIL, DEMO_PASSWORD).await;

    let response = app
        .post_form("/admin/issues/1/assign", "assignee=6", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/admin");
    assert_eq!(app.issue(1).await.assigned_to, Some(UserId::new(6)));
    let html = body_text(app.get("/admin", Some(&cookie)).await).await;
    assert!(html.contains("Issue #1 assigned to Park Maintenance"));

    app.post_form("/admin/issues/1/assign", "assignee=", Some(&cookie))
        .await;
    assert_eq!(app.issue(1).await.assigned_to, None);
    let html = body_text(app.get("/admin", Some(&cookie)).await).await;
    assert!(html.contains("Issue #1 unassigned"));
}

#[tokio::test]
async fn test_admin_assigns_citizen_worker() {
    let app = TestApp::seeded().await;
    let cookie = app.login(ADMIN_EMAIL, DEMO_PASSWORD).await;

    app.post_form("/admin/issues/2/assign", "assignee=3", Some(&cookie))
        .await;
    assert_eq!(app.issue(2).await.assigned_to, Some(UserId::new(3)));

    let html = body_text(app.get("/admin", Some(&cookie)).await).await;
    assert!(html.contains("Issue #2 assigned to Sam Rivera"));
    assert!(html.contains(r#"<option value="3" selected>Sam Rivera</option>"#));
}

#[tokio::test]
async fn test_admin_cannot_assign_unknown_user() {
    let app = TestApp::seeded().await;
    let cookie = app.login(ADMIN_EMAIL, DEMO_PASSWORD).await;

    app.post_form("/admin/issues/2/assign", "assignee=999", Some(&cookie))
        .await;
    assert_eq!(app.issue(2).await.assigned_to, Some(UserId::new(7)));

    let html = body_text(app.get("/admin", Some(&cookie)).await).await;
    assert!(html.contains("Failed to assign issue #2: assignee does not exist"));
}

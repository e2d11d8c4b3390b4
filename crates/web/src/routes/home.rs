//! Landing page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tower_sessions::Session;

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::Layout;

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub layout: Layout,
}

/// Display the landing page.
pub async fn home(session: Session, OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    HomeTemplate {
        layout: Layout::load(&session, user).await,
    }
}

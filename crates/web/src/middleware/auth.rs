//! Authentication extractors.
//!
//! These read the signed-in user straight from the session. Handlers that
//! sign users in or out use [`crate::services::AuthSession`] instead.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use civic_pulse_core::CurrentUser;

use crate::models::{Flash, session_keys};

/// Flash shown to signed-in users who open an admin page.
pub const ADMIN_ONLY_MESSAGE: &str = "You do not have permission to access the admin panel";

/// Why a guarded request was turned away.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page (HTML requests).
    RedirectToLogin,
    /// Redirect to the dashboard (signed in, but not an admin).
    RedirectToDashboard,
    /// 401 for API requests.
    Unauthorized,
    /// 403 for API requests.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::RedirectToDashboard => Redirect::to("/dashboard").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

/// The path as the client sent it; nested routers see it with the prefix stripped.
fn request_uri(parts: &Parts) -> &Uri {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0)
}

fn is_api(parts: &Parts) -> bool {
    request_uri(parts).path().starts_with("/api/")
}

/// The signed-in user, if any. An unreadable session counts as signed out.
async fn session_user(session: &Session) -> Option<CurrentUser> {
    match session.get::<CurrentUser>(session_keys::CURRENT_USER).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read signed-in user from session");
            None
        }
    }
}

/// Extractor that requires a signed-in user.
///
/// ```rust,ignore
/// async fn report_page(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Reporting as {}", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        match session_user(session).await {
            Some(user) => Ok(Self(user)),
            None if is_api(parts) => Err(AuthRejection::Unauthorized),
            None => Err(AuthRejection::RedirectToLogin),
        }
    }
}

/// Extractor that requires a signed-in administrator.
///
/// Citizens get a flash notification and land on the dashboard.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if user.is_admin() {
            return Ok(Self(user));
        }

        tracing::info!(user_id = %user.id, path = request_uri(parts).path(), "Non-admin turned away from admin route");
        if is_api(parts) {
            return Err(AuthRejection::Forbidden);
        }
        if let Some(session) = parts.extensions.get::<Session>() {
            Flash::error(ADMIN_ONLY_MESSAGE).push(session).await;
        }
        Err(AuthRejection::RedirectToDashboard)
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session_user(session).await,
            None => None,
        };
        Ok(Self(user))
    }
}

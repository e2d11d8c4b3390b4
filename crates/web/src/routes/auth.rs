//! Authentication route handlers: password sign-in, sign-up and sign-out.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::error::add_breadcrumb;
use crate::filters;
use crate::models::Flash;
use crate::routes::Layout;
use crate::services::{AuthError, AuthSession};

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub email: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub name: String,
    pub email: String,
}

fn form_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::InvalidEmail(_) | AuthError::InvalidName(_) | AuthError::WeakPassword(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AuthError::Session(_) | AuthError::Repository(_) | AuthError::PasswordHash => {
            tracing::error!(error = %err, "Authentication failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in users go straight to the dashboard.
pub async fn login_page(auth: AuthSession) -> Response {
    if auth.is_authenticated() {
        return Redirect::to("/dashboard").into_response();
    }
    LoginTemplate {
        layout: Layout::load(auth.session(), None).await,
        error: None,
        email: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
pub async fn login(auth: AuthSession, Form(form): Form<LoginForm>) -> Response {
    match auth.login(&form.email, &form.password).await {
        Ok(user) => {
            add_breadcrumb("auth", "Logged in", None);
            Flash::success(format!("Welcome back, {}!", user.name))
                .push(auth.session())
                .await;
            Redirect::to("/dashboard").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            let status = form_status(&e);
            let page = LoginTemplate {
                layout: Layout::without_flash(None),
                error: Some(e.user_message()),
                email: form.email,
            };
            (status, page).into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(auth: AuthSession) -> Response {
    if auth.is_authenticated() {
        return Redirect::to("/dashboard").into_response();
    }
    RegisterTemplate {
        layout: Layout::load(auth.session(), None).await,
        error: None,
        name: String::new(),
        email: String::new(),
    }
    .into_response()
}

/// Handle registration form submission. New accounts are signed in.
pub async fn register(auth: AuthSession, Form(form): Form<RegisterForm>) -> Response {
    match auth.register(&form.name, &form.email, &form.password).await {
        Ok(user) => {
            add_breadcrumb("auth", "Registered", None);
            Flash::success(format!("Welcome to Civic Pulse, {}!", user.name))
                .push(auth.session())
                .await;
            Redirect::to("/dashboard").into_response()
        }
        Err(e) => {
            tracing::info!(error = %e, "Registration rejected");
            let status = form_status(&e);
            let page = RegisterTemplate {
                layout: Layout::without_flash(None),
                error: Some(e.user_message()),
                name: form.name,
                email: form.email,
            };
            (status, page).into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out and return to the landing page.
pub async fn logout(auth: AuthSession) -> Response {
    if let Err(e) = auth.logout().await {
        tracing::error!(error = %e, "Failed to clear session on logout");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Could not sign out, please try again")
            .into_response();
    }
    Flash::success("You have been signed out").push(auth.session()).await;
    Redirect::to("/").into_response()
}

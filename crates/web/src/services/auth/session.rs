//! Per-request authentication session.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tokio::sync::watch;
use tower_sessions::Session;

use civic_pulse_core::CurrentUser;

use super::{AuthError, AuthService};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::session_keys;
use crate::state::AppState;

/// Sign-in state of one browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The persisted session has not been read yet.
    Loading,
    SignedOut,
    SignedIn(CurrentUser),
}

/// Holds the signed-in user for one session and publishes every change.
///
/// Built per request by its extractor, which restores the persisted state
/// before the handler runs. Observers call [`AuthSession::subscribe`] and
/// receive each new [`SessionState`].
pub struct AuthSession {
    session: Session,
    auth: AuthService,
    state: watch::Sender<SessionState>,
}

impl AuthSession {
    /// Create a holder in the `Loading` state.
    #[must_use]
    pub fn new(session: Session, auth: AuthService) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            session,
            auth,
            state,
        }
    }

    /// Read the persisted user from the session store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session store cannot be read.
    pub async fn restore(&self) -> Result<(), AuthError> {
        let user: Option<CurrentUser> = self.session.get(session_keys::CURRENT_USER).await?;
        self.publish(user.map_or(SessionState::SignedOut, SessionState::SignedIn));
        Ok(())
    }

    /// Receive every subsequent state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<CurrentUser> {
        match &*self.state.borrow() {
            SessionState::SignedIn(user) => Some(user.clone()),
            SessionState::Loading | SessionState::SignedOut => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::SignedIn(_))
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Loading)
    }

    /// The underlying session, for flash messages.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Sign in with email and password.
    ///
    /// On failure the state is left as it was.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` from the identity service or the session store.
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let user = self.auth.login(email, password).await?;
        self.sign_in(&user).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok(user)
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` from validation, the identity service or the
    /// session store.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<CurrentUser, AuthError> {
        let user = self.auth.register(name, email, password).await?;
        self.sign_in(&user).await?;
        Ok(user)
    }

    /// Sign out. Calling this while signed out is a no-op apart from
    /// clearing the session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session store cannot be cleared.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Some(user) = self.current_user() {
            tracing::info!(user_id = %user.id, "User logged out");
        }
        self.session.flush().await?;
        clear_sentry_user();
        self.publish(SessionState::SignedOut);
        Ok(())
    }

    async fn sign_in(&self, user: &CurrentUser) -> Result<(), AuthError> {
        self.session.cycle_id().await?;
        self.session
            .insert(session_keys::CURRENT_USER, user)
            .await?;
        set_sentry_user(&user.id, Some(user.email.as_str()));
        self.publish(SessionState::SignedIn(user.clone()));
        Ok(())
    }

    fn publish(&self, state: SessionState) {
        self.state.send_replace(state);
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))?;

        let auth = Self::new(session, state.auth());
        auth.restore().await?;
        Ok(auth)
    }
}

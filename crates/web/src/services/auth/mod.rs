//! Authentication service.
//!
//! [`AuthService`] talks to the identity store (password sign-in, sign-up and
//! profile lookup). [`AuthSession`] binds it to one browser session and tracks
//! the signed-in state.

mod error;
mod session;

pub use error::AuthError;
pub use session::{AuthSession, SessionState};

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use civic_pulse_core::{CurrentUser, Email, Profile, UserId};

use crate::db::{RepositoryError, UserStore};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum display name length, in characters.
const MAX_NAME_LENGTH: usize = 100;

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
}

impl AuthService {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Register a new citizen account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidName` for a blank or overlong name,
    /// `AuthError::InvalidEmail` for a malformed email,
    /// `AuthError::WeakPassword` if the password is too short, and
    /// `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<CurrentUser, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create_user(&email, name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user.into())
    }

    /// Login with email and password.
    ///
    /// The profile is looked up after the password check. When that lookup
    /// fails or finds nothing, the user is still signed in with a profile
    /// derived from the email address.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;

        let credentials = self
            .users
            .find_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &credentials.password_hash)?;

        let profile = self
            .load_profile(credentials.user_id, &credentials.email)
            .await;
        Ok(CurrentUser::new(credentials.user_id, credentials.email, profile))
    }

    async fn load_profile(&self, user_id: UserId, email: &Email) -> Profile {
        match self.users.get_profile(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!(%user_id, "No profile found, using fallback profile");
                Profile::fallback_for(email)
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Profile lookup failed, using fallback profile");
                Profile::fallback_for(email)
            }
        }
    }
}

/// Validate a display name, returning it trimmed.
fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidName("Please enter your name".to_owned()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::InvalidName(format!(
            "Name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

//! Users, profiles and the signed-in identity.

use serde::{Deserialize, Serialize};

use crate::types::{Email, UserId, UserRole};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
}

/// Display name and role stored alongside an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub role: UserRole,
}

impl Profile {
    /// Profile synthesised when none can be loaded: the email's local part as
    /// the name, and the citizen role.
    #[must_use]
    pub fn fallback_for(email: &Email) -> Self {
        Self {
            name: email.local_part().to_owned(),
            role: UserRole::Citizen,
        }
    }
}

/// The identity carried by a signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub fn new(id: UserId, email: Email, profile: Profile) -> Self {
        Self {
            id,
            name: profile.name,
            email,
            role: profile.role,
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

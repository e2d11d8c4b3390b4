//! Issue status and user role enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a status or role string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value:?}")]
pub struct StatusParseError {
    kind: &'static str,
    value: String,
}

impl StatusParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Lifecycle status of a reported issue.
///
/// Any status may be set from any other; there is no transition guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Reported, not yet looked at.
    #[default]
    Pending,
    /// Being worked on.
    InProgress,
    /// Fixed.
    Resolved,
}

impl IssueStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Resolved];

    /// Machine-readable form used in URLs, forms and the database.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for IssueStatus {
    type Err = StatusParseError;

    /// Accepts the slug or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|status| status.slug() == normalized)
            .ok_or_else(|| StatusParseError::new("issue status", s))
    }
}

/// Role of a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Can report, upvote and comment.
    #[default]
    Citizen,
    /// Can additionally triage, assign and resolve issues.
    Admin,
}

impl UserRole {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Citizen => write!(f, "citizen"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "citizen" => Ok(Self::Citizen),
            "admin" => Ok(Self::Admin),
            _ => Err(StatusParseError::new("user role", s)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_slug_and_label() {
        assert_eq!("pending".parse::<IssueStatus>().unwrap(), IssueStatus::Pending);
        assert_eq!(
            "In Progress".parse::<IssueStatus>().unwrap(),
            IssueStatus::InProgress
        );
        assert_eq!(
            "in_progress".parse::<IssueStatus>().unwrap(),
            IssueStatus::InProgress
        );
        assert_eq!(
            " RESOLVED ".parse::<IssueStatus>().unwrap(),
            IssueStatus::Resolved
        );
    }

    #[test]
    fn test_status_rejects_unknown() {
        let err = "closed".parse::<IssueStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid issue status: \"closed\"");
        assert!("".parse::<IssueStatus>().is_err());
    }

    #[test]
    fn test_status_display_uses_label() {
        assert_eq!(IssueStatus::InProgress.to_string(), "In Progress");
        assert_eq!(IssueStatus::InProgress.slug(), "in_progress");
    }

    #[test]
    fn test_status_serde_uses_slug() {
        let json = serde_json::to_string(&IssueStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_role_roundtrip_and_default() {
        assert_eq!(UserRole::default(), UserRole::Citizen);
        assert_eq!("Admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(UserRole::Admin.to_string(), "admin");
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Citizen.is_admin());
        assert!("superuser".parse::<UserRole>().is_err());
    }
}

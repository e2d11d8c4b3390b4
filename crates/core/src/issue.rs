//! Reported issues, their comments and upvotes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CommentId, IssueId, IssueStatus, Location, UserId};

/// The set of users who upvoted an issue, in the order they upvoted.
///
/// Membership is unique; the only mutation is [`Upvotes::toggle`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<UserId>", into = "Vec<UserId>")]
pub struct Upvotes(Vec<UserId>);

impl Upvotes {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Add the user if absent, remove them if present.
    ///
    /// Returns `true` when the user upvotes the issue after the call.
    pub fn toggle(&mut self, user: UserId) -> bool {
        if let Some(pos) = self.0.iter().position(|u| *u == user) {
            self.0.remove(pos);
            false
        } else {
            self.0.push(user);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, user: UserId) -> bool {
        self.0.contains(&user)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<UserId> for Upvotes {
    /// Duplicates are dropped, keeping the first occurrence.
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        let mut users = Vec::new();
        for user in iter {
            if !users.contains(&user) {
                users.push(user);
            }
        }
        Self(users)
    }
}

impl From<Vec<UserId>> for Upvotes {
    fn from(users: Vec<UserId>) -> Self {
        users.into_iter().collect()
    }
}

impl From<Upvotes> for Vec<UserId> {
    fn from(upvotes: Upvotes) -> Self {
        upvotes.0
    }
}

/// A comment on an issue.
///
/// The author's display name is a snapshot taken when the comment was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub body: String,
    pub author_id: UserId,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

/// A reported civic issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub location: Location,
    pub status: IssueStatus,
    /// Fixed at creation.
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub assigned_to: Option<UserId>,
    pub upvotes: Upvotes,
    /// Oldest first.
    pub comments: Vec<Comment>,
}

impl Issue {
    /// Build a freshly created issue from its insert payload.
    #[must_use]
    pub fn from_new(id: IssueId, new: NewIssue, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            description: new.description,
            image_url: new.image_url,
            location: new.location,
            status: IssueStatus::Pending,
            created_by: new.created_by,
            created_at,
            assigned_to: None,
            upvotes: Upvotes::new(),
            comments: Vec::new(),
        }
    }

    /// Case-insensitive substring match against title, description and address.
    ///
    /// An empty term matches everything.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        if term.is_empty() {
            return true;
        }
        let needle = term.to_lowercase();
        [
            self.title.as_str(),
            self.description.as_str(),
            self.location.address(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Payload for inserting a new issue. New issues always start as Pending.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub location: Location,
    pub created_by: UserId,
}

/// Payload for appending a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub body: String,
    pub author_id: UserId,
    pub author_name: String,
}

impl NewComment {
    /// Longest accepted comment body, in characters.
    pub const MAX_CHARS: usize = 2000;

    /// Trim and check the body length.
    ///
    /// Returns `None` for a blank or overlong body.
    #[must_use]
    pub fn new(body: &str, author_id: UserId, author_name: &str) -> Option<Self> {
        let body = body.trim();
        if body.is_empty() || body.chars().count() > Self::MAX_CHARS {
            return None;
        }
        Some(Self {
            body: body.to_owned(),
            author_id,
            author_name: author_name.to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn issue(title: &str, description: &str, address: &str) -> Issue {
        Issue::from_new(
            IssueId::new(1),
            NewIssue {
                title: title.to_owned(),
                description: description.to_owned(),
                image_url: None,
                location: Location::new(40.0, -74.0, address).unwrap(),
                created_by: UserId::new(10),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_toggle_is_its_own_inverse() {
        let mut upvotes: Upvotes = vec![UserId::new(1), UserId::new(2)].into();

        assert!(!upvotes.toggle(UserId::new(1)));
        assert_eq!(upvotes.iter().collect::<Vec<_>>(), vec![UserId::new(2)]);

        assert!(upvotes.toggle(UserId::new(1)));
        assert!(upvotes.contains(UserId::new(1)));
        assert!(upvotes.contains(UserId::new(2)));
        assert_eq!(upvotes.len(), 2);
    }

    #[test]
    fn test_upvotes_deduplicate_on_construction() {
        let upvotes: Upvotes = vec![UserId::new(3), UserId::new(3), UserId::new(4)].into();
        assert_eq!(upvotes.len(), 2);

        let parsed: Upvotes = serde_json::from_str("[5,5,6]").unwrap();
        assert_eq!(parsed.iter().collect::<Vec<_>>(), vec![UserId::new(5), UserId::new(6)]);
    }

    #[test]
    fn test_new_issue_starts_pending_and_unassigned() {
        let issue = issue("Broken Road", "Large crack across both lanes", "Main St");
        assert_eq!(issue.status, IssueStatus::Pending);
        assert_eq!(issue.assigned_to, None);
        assert!(issue.upvotes.is_empty());
        assert!(issue.comments.is_empty());
    }

    #[test]
    fn test_matches_search_fields_case_insensitively() {
        let issue = issue("Broken Road", "Crack near the school", "Elm Avenue");
        assert!(issue.matches_search(""));
        assert!(issue.matches_search("road"));
        assert!(issue.matches_search("SCHOOL"));
        assert!(issue.matches_search("elm ave"));
        assert!(!issue.matches_search("graffiti"));
    }

    #[test]
    fn test_new_comment_validation() {
        assert!(NewComment::new("   ", UserId::new(1), "Ana").is_none());
        assert!(NewComment::new(&"x".repeat(2001), UserId::new(1), "Ana").is_none());
        let comment = NewComment::new("  On it  ", UserId::new(1), "Ana").unwrap();
        assert_eq!(comment.body, "On it");
    }
}

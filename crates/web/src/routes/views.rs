//! Data shared by every rendered page.

use tower_sessions::Session;

use civic_pulse_core::{CurrentUser, Issue, User, UserId};

use crate::models::Flash;

/// Header and notification data for `base.html`.
pub struct Layout {
    pub user: Option<CurrentUser>,
    pub flash: Option<Flash>,
}

impl Layout {
    /// Build the layout, consuming any pending flash.
    pub async fn load(session: &Session, user: Option<CurrentUser>) -> Self {
        Self {
            user,
            flash: Flash::take(session).await,
        }
    }

    /// Layout for a page rendered in response to a failed form post; the
    /// pending flash is left for the next full page.
    #[must_use]
    pub const fn without_flash(user: Option<CurrentUser>) -> Self {
        Self { user, flash: None }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }
}

/// One issue, flattened for listing templates.
pub struct IssueCard {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub address: String,
    pub coordinates: String,
    pub map_url: String,
    pub status_slug: &'static str,
    pub status_label: &'static str,
    pub upvotes: usize,
    pub upvoted: bool,
    pub comments: usize,
    pub reported_on: String,
    pub assignee_id: Option<i32>,
    pub assignee_name: Option<String>,
}

impl IssueCard {
    /// Flatten `issue` for `viewer`; `people` resolves the assignee's name.
    #[must_use]
    pub fn new(issue: &Issue, viewer: UserId, people: &[User]) -> Self {
        let assignee_name = issue.assigned_to.map(|id| {
            people
                .iter()
                .find(|u| u.id == id)
                .map_or_else(|| format!("User #{id}"), |u| u.name.clone())
        });

        Self {
            id: issue.id.as_i32(),
            title: issue.title.clone(),
            description: issue.description.clone(),
            image_url: issue.image_url.clone(),
            address: issue.location.address().to_owned(),
            coordinates: format!(
                "{:.5}, {:.5}",
                issue.location.latitude(),
                issue.location.longitude()
            ),
            map_url: issue.location.map_url(),
            status_slug: issue.status.slug(),
            status_label: issue.status.label(),
            upvotes: issue.upvotes.len(),
            upvoted: issue.upvotes.contains(viewer),
            comments: issue.comments.len(),
            reported_on: issue.created_at.format("%b %-d, %Y").to_string(),
            assignee_id: issue.assigned_to.map(|id| id.as_i32()),
            assignee_name,
        }
    }

    /// Whether `user_id` is the current assignee (for `<select>` state).
    #[must_use]
    pub fn is_assigned_to(&self, user_id: &UserId) -> bool {
        self.assignee_id == Some(user_id.as_i32())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use civic_pulse_core::{Email, IssueId, IssueStatus, Location, NewIssue, UserRole};

    use super::*;

    #[test]
    fn test_issue_card_flattens_issue() {
        let mut issue = Issue::from_new(
            IssueId::new(3),
            NewIssue {
                title: "Broken Swing".to_owned(),
                description: "Chain snapped on the left swing".to_owned(),
                image_url: None,
                location: Location::new(40.725, -74.012, "City Park").unwrap(),
                created_by: UserId::new(1),
            },
            Utc.with_ymd_and_hms(2024, 5, 7, 9, 30, 0).unwrap(),
        );
        issue.status = IssueStatus::InProgress;
        issue.assigned_to = Some(UserId::new(9));
        issue.upvotes.toggle(UserId::new(2));

        let crew = User {
            id: UserId::new(9),
            name: "Park Maintenance".to_owned(),
            email: Email::parse("maintenance@example.org").unwrap(),
            role: UserRole::Admin,
        };

        let card = IssueCard::new(&issue, UserId::new(2), &[crew]);
        assert_eq!(card.status_label, "In Progress");
        assert_eq!(card.status_slug, "in_progress");
        assert!(card.upvoted);
        assert_eq!(card.reported_on, "May 7, 2024");
        assert_eq!(card.coordinates, "40.72500, -74.01200");
        assert_eq!(card.assignee_name.as_deref(), Some("Park Maintenance"));
        assert!(card.is_assigned_to(&UserId::new(9)));
        assert!(!card.is_assigned_to(&UserId::new(2)));

        let stranger = IssueCard::new(&issue, UserId::new(5), &[]);
        assert!(!stranger.upvoted);
        assert_eq!(stranger.assignee_name.as_deref(), Some("User #9"));
    }
}

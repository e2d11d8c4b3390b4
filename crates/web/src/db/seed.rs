//! Demo data: a handful of residents, city staff and neighbourhood issues.
//!
//! Seeding reuses accounts that already exist (matched by email) and only
//! inserts issues into an empty store, so it is safe to run twice.

use civic_pulse_core::{
    Email, IssueStatus, Location, NewComment, NewIssue, User, UserRole,
};

use super::{IssueStore, RepositoryError, UserStore};

struct DemoUser {
    name: &'static str,
    email: &'static str,
    role: UserRole,
}

const DEMO_USERS: &[DemoUser] = &[
    DemoUser { name: "Jane Doe", email: "jane@civicpulse.test", role: UserRole::Citizen },
    DemoUser { name: "Concerned Parent", email: "parent@civicpulse.test", role: UserRole::Citizen },
    DemoUser { name: "Sam Rivera", email: "sam@civicpulse.test", role: UserRole::Citizen },
    DemoUser { name: "Priya Shah", email: "priya@civicpulse.test", role: UserRole::Citizen },
    DemoUser { name: "Park Services", email: "parks@civicpulse.test", role: UserRole::Admin },
    DemoUser { name: "Park Maintenance", email: "maintenance@civicpulse.test", role: UserRole::Admin },
    DemoUser { name: "City Admin", email: "admin@civicpulse.test", role: UserRole::Admin },
];

struct DemoIssue {
    title: &'static str,
    description: &'static str,
    image_url: &'static str,
    lat: f64,
    lng: f64,
    address: &'static str,
    status: IssueStatus,
    /// Indexes into `DEMO_USERS`.
    creator: usize,
    assignee: Option<usize>,
    upvoters: &'static [usize],
    comments: &'static [(usize, &'static str)],
}

const DEMO_ISSUES: &[DemoIssue] = &[
    DemoIssue {
        title: "Broken Streetlight",
        description: "The streetlight at the corner of Main and 1st has been out for over a week, making the intersection dangerous at night.",
        image_url: "https://images.unsplash.com/photo-1465146344425-f00d5f5c8f07?auto=format&fit=crop&w=800&h=500&q=80",
        lat: 40.7128,
        lng: -74.0060,
        address: "Corner of Main St & 1st Ave",
        status: IssueStatus::Pending,
        creator: 2,
        assignee: None,
        upvoters: &[0, 1, 3],
        comments: &[(0, "I noticed this too. Very dangerous!")],
    },
    DemoIssue {
        title: "Pothole on Oak Street",
        description: "Large pothole on Oak Street between 3rd and 4th Avenue. It's causing damage to vehicles.",
        image_url: "https://images.unsplash.com/photo-1552761831-7af39aude0ca?auto=format&fit=crop&w=800&h=500&q=80",
        lat: 40.7200,
        lng: -74.0100,
        address: "Oak Street between 3rd and 4th Ave",
        status: IssueStatus::InProgress,
        creator: 2,
        assignee: Some(6),
        upvoters: &[0, 3],
        comments: &[],
    },
    DemoIssue {
        title: "Overflowing Trash Bin",
        description: "The public trash bin in Central Park hasn't been emptied for days and is overflowing.",
        image_url: "https://images.unsplash.com/photo-1605600659873-d808a13e4d9a?auto=format&fit=crop&w=800&h=500&q=80",
        lat: 40.7300,
        lng: -74.0050,
        address: "Central Park, near east entrance",
        status: IssueStatus::Resolved,
        creator: 1,
        assignee: Some(4),
        upvoters: &[2, 3],
        comments: &[(4, "This has been cleaned up now.")],
    },
    DemoIssue {
        title: "Graffiti on Public Library",
        description: "Someone has spray painted graffiti on the north wall of the public library building.",
        image_url: "https://images.unsplash.com/photo-1533625216968-c4d9a9a7a636?auto=format&fit=crop&w=800&h=500&q=80",
        lat: 40.7180,
        lng: -74.0080,
        address: "Public Library, 500 Main St",
        status: IssueStatus::Pending,
        creator: 3,
        assignee: None,
        upvoters: &[1],
        comments: &[],
    },
    DemoIssue {
        title: "Broken Swing in Park",
        description: "One of the swings in the children's playground is broken and poses a safety risk.",
        image_url: "https://images.unsplash.com/photo-1575783970733-1aaedde1db74?auto=format&fit=crop&w=800&h=500&q=80",
        lat: 40.7250,
        lng: -74.0120,
        address: "City Park Playground, West Side",
        status: IssueStatus::InProgress,
        creator: 1,
        assignee: Some(5),
        upvoters: &[0, 2, 3],
        comments: &[
            (1, "My child almost got hurt on this swing."),
            (5, "We have ordered replacement parts and will fix this by next week."),
        ],
    },
];

/// What a seeding run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users_created: usize,
    pub users_existing: usize,
    pub issues_created: usize,
}

/// Email addresses of the demo accounts, citizens first.
pub fn demo_emails() -> impl Iterator<Item = &'static str> {
    DEMO_USERS.iter().map(|u| u.email)
}

/// Insert the demo accounts and issues.
///
/// Every new account gets `password_hash` as its credential.
///
/// # Errors
///
/// Returns the first `RepositoryError` raised by either store.
pub async fn seed_demo_data(
    users: &dyn UserStore,
    issues: &dyn IssueStore,
    password_hash: &str,
) -> Result<SeedSummary, RepositoryError> {
    let mut summary = SeedSummary::default();
    let mut accounts: Vec<User> = Vec::with_capacity(DEMO_USERS.len());

    for demo in DEMO_USERS {
        let email = Email::parse(demo.email)
            .map_err(|e| RepositoryError::DataCorruption(format!("demo email: {e}")))?;

        let account = if let Some(existing) = users.get_user_by_email(&email).await? {
            summary.users_existing += 1;
            existing
        } else {
            let created = users.create_user(&email, demo.name, password_hash).await?;
            summary.users_created += 1;
            if demo.role == UserRole::Citizen {
                created
            } else {
                users.set_role(&email, demo.role).await?
            }
        };
        accounts.push(account);
    }

    if !issues.list().await?.is_empty() {
        tracing::info!("Issue store not empty, skipping demo issues");
        return Ok(summary);
    }

    let account = |index: usize| {
        accounts
            .get(index)
            .ok_or_else(|| RepositoryError::DataCorruption(format!("no demo user #{index}")))
    };

    for demo in DEMO_ISSUES {
        let location = Location::new(demo.lat, demo.lng, demo.address)
            .map_err(|e| RepositoryError::DataCorruption(format!("demo location: {e}")))?;

        let issue = issues
            .insert(NewIssue {
                title: demo.title.to_owned(),
                description: demo.description.to_owned(),
                image_url: Some(demo.image_url.to_owned()),
                location,
                created_by: account(demo.creator)?.id,
            })
            .await?;

        if demo.status != IssueStatus::Pending {
            issues.set_status(issue.id, demo.status).await?;
        }
        if let Some(assignee) = demo.assignee {
            issues.assign(issue.id, Some(account(assignee)?.id)).await?;
        }
        for &voter in demo.upvoters {
            issues.toggle_upvote(issue.id, account(voter)?.id).await?;
        }
        for &(author, body) in demo.comments {
            let author = account(author)?;
            let comment = NewComment::new(body, author.id, &author.name).ok_or_else(|| {
                RepositoryError::DataCorruption(format!("demo comment on '{}'", demo.title))
            })?;
            issues.add_comment(issue.id, comment).await?;
        }

        summary.issues_created += 1;
    }

    tracing::info!(
        users_created = summary.users_created,
        issues_created = summary.issues_created,
        "Demo data seeded"
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use civic_pulse_core::IssueStats;

    use super::*;
    use crate::db::memory::{MemoryIssueStore, MemoryUserStore};

    #[tokio::test]
    async fn test_seed_populates_empty_stores() {
        let users = MemoryUserStore::new();
        let issues = MemoryIssueStore::new();

        let summary = seed_demo_data(&users, &issues, "hash").await.unwrap();
        assert_eq!(summary.users_created, DEMO_USERS.len());
        assert_eq!(summary.issues_created, 5);

        let all = issues.list().await.unwrap();
        assert_eq!(
            IssueStats::count(&all),
            IssueStats {
                total: 5,
                pending: 2,
                in_progress: 2,
                resolved: 1,
            }
        );
        let swing = all.iter().find(|i| i.title == "Broken Swing in Park").unwrap();
        assert_eq!(swing.comments.len(), 2);
        assert_eq!(swing.upvotes.len(), 3);
        assert_eq!(users.list_by_role(UserRole::Admin).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_seed_twice_is_harmless() {
        let users = MemoryUserStore::new();
        let issues = MemoryIssueStore::new();

        seed_demo_data(&users, &issues, "hash").await.unwrap();
        let again = seed_demo_data(&users, &issues, "hash").await.unwrap();

        assert_eq!(again.users_created, 0);
        assert_eq!(again.users_existing, DEMO_USERS.len());
        assert_eq!(again.issues_created, 0);
        assert_eq!(issues.list().await.unwrap().len(), 5);
    }
}

//! Status counts over the working set.

use serde::Serialize;

use crate::issue::Issue;
use crate::types::IssueStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
}

impl IssueStats {
    #[must_use]
    pub fn count(issues: &[Issue]) -> Self {
        issues.iter().fold(Self::default(), |mut stats, issue| {
            stats.total += 1;
            match issue.status {
                IssueStatus::Pending => stats.pending += 1,
                IssueStatus::InProgress => stats.in_progress += 1,
                IssueStatus::Resolved => stats.resolved += 1,
            }
            stats
        })
    }

    #[must_use]
    pub const fn for_status(&self, status: IssueStatus) -> usize {
        match status {
            IssueStatus::Pending => self.pending,
            IssueStatus::InProgress => self.in_progress,
            IssueStatus::Resolved => self.resolved,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::issue::NewIssue;
    use crate::types::{IssueId, Location, UserId};

    #[test]
    fn test_counts_each_status() {
        let statuses = [
            IssueStatus::Pending,
            IssueStatus::Pending,
            IssueStatus::Resolved,
            IssueStatus::InProgress,
        ];
        let issues: Vec<Issue> = statuses
            .iter()
            .zip(1..)
            .map(|(status, id)| {
                let mut issue = Issue::from_new(
                    IssueId::new(id),
                    NewIssue {
                        title: format!("Issue {id}"),
                        description: "Something needs fixing here".to_owned(),
                        image_url: None,
                        location: Location::new(0.0, 0.0, "Somewhere").unwrap(),
                        created_by: UserId::new(1),
                    },
                    Utc::now(),
                );
                issue.status = *status;
                issue
            })
            .collect();

        let stats = IssueStats::count(&issues);
        assert_eq!(
            stats,
            IssueStats {
                total: 4,
                pending: 2,
                in_progress: 1,
                resolved: 1,
            }
        );
        assert_eq!(stats.for_status(IssueStatus::Pending), 2);
        assert_eq!(IssueStats::count(&[]), IssueStats::default());
    }
}

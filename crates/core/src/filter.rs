//! Filtering of the issue working set.
//!
//! An issue is kept when it matches the search term (see
//! [`Issue::matches_search`]) AND its status is in the selected set. Order of
//! the input is preserved.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::issue::Issue;
use crate::types::{IssueStatus, StatusParseError};

/// A subset of [`IssueStatus`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusSet(u8);

impl StatusSet {
    const fn bit(status: IssueStatus) -> u8 {
        match status {
            IssueStatus::Pending => 0b001,
            IssueStatus::InProgress => 0b010,
            IssueStatus::Resolved => 0b100,
        }
    }

    #[must_use]
    pub const fn all() -> Self {
        Self(0b111)
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn only(status: IssueStatus) -> Self {
        Self(Self::bit(status))
    }

    #[must_use]
    pub const fn with(self, status: IssueStatus) -> Self {
        Self(self.0 | Self::bit(status))
    }

    #[must_use]
    pub const fn contains(self, status: IssueStatus) -> bool {
        self.0 & Self::bit(status) != 0
    }

    /// Flip membership of one status.
    pub const fn toggle(&mut self, status: IssueStatus) {
        self.0 ^= Self::bit(status);
    }

    #[must_use]
    pub const fn is_all(self) -> bool {
        self.0 == Self::all().0
    }

    pub fn iter(self) -> impl Iterator<Item = IssueStatus> {
        IssueStatus::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl Default for StatusSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<IssueStatus> for StatusSet {
    fn from_iter<I: IntoIterator<Item = IssueStatus>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl FromStr for StatusSet {
    type Err = StatusParseError;

    /// `"all"` (or an empty string) selects everything; otherwise a
    /// comma-separated list of statuses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse::<IssueStatus>)
            .collect()
    }
}

impl fmt::Display for StatusSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return f.write_str("all");
        }
        let slugs: Vec<&str> = self.iter().map(IssueStatus::slug).collect();
        f.write_str(&slugs.join(","))
    }
}

impl Serialize for StatusSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StatusSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Search term plus status subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub statuses: StatusSet,
}

impl IssueFilter {
    #[must_use]
    pub fn new(search: impl Into<String>, statuses: StatusSet) -> Self {
        Self {
            search: search.into(),
            statuses,
        }
    }

    #[must_use]
    pub fn matches(&self, issue: &Issue) -> bool {
        issue.matches_search(&self.search) && self.statuses.contains(issue.status)
    }

    /// Keep matching issues, preserving order.
    #[must_use]
    pub fn apply<'a>(&self, issues: &'a [Issue]) -> Vec<&'a Issue> {
        issues.iter().filter(|issue| self.matches(issue)).collect()
    }

    /// Owned variant of [`IssueFilter::apply`].
    #[must_use]
    pub fn apply_owned(&self, issues: Vec<Issue>) -> Vec<Issue> {
        issues.into_iter().filter(|issue| self.matches(issue)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::issue::NewIssue;
    use crate::types::{IssueId, Location, UserId};

    fn issue(id: i32, title: &str, status: IssueStatus) -> Issue {
        let mut issue = Issue::from_new(
            IssueId::new(id),
            NewIssue {
                title: title.to_owned(),
                description: "Reported by a resident".to_owned(),
                image_url: None,
                location: Location::new(40.0, -74.0, "Downtown").unwrap(),
                created_by: UserId::new(1),
            },
            Utc::now(),
        );
        issue.status = status;
        issue
    }

    fn titles(issues: &[&Issue]) -> Vec<String> {
        issues.iter().map(|i| i.title.clone()).collect()
    }

    #[test]
    fn test_search_and_status_are_conjunctive() {
        let issues = vec![
            issue(1, "Broken Road", IssueStatus::Pending),
            issue(2, "Graffiti", IssueStatus::Resolved),
        ];
        let filter = IssueFilter::new(
            "road",
            StatusSet::from_iter([IssueStatus::Pending, IssueStatus::InProgress]),
        );
        assert_eq!(titles(&filter.apply(&issues)), vec!["Broken Road"]);
    }

    #[test]
    fn test_default_filter_keeps_everything_in_order() {
        let issues = vec![
            issue(3, "Streetlight", IssueStatus::Resolved),
            issue(1, "Pothole", IssueStatus::Pending),
            issue(2, "Trash", IssueStatus::InProgress),
        ];
        let kept = IssueFilter::default().apply(&issues);
        assert_eq!(titles(&kept), vec!["Streetlight", "Pothole", "Trash"]);
    }

    #[test]
    fn test_empty_status_set_keeps_nothing() {
        let issues = vec![issue(1, "Pothole", IssueStatus::Pending)];
        let filter = IssueFilter::new("", StatusSet::empty());
        assert!(filter.apply(&issues).is_empty());
    }

    #[test]
    fn test_search_matches_address() {
        let issues = vec![issue(1, "Pothole", IssueStatus::Pending)];
        let filter = IssueFilter::new("DOWNTOWN", StatusSet::all());
        assert_eq!(filter.apply(&issues).len(), 1);
    }

    #[test]
    fn test_status_set_parse_and_display() {
        assert_eq!("all".parse::<StatusSet>().unwrap(), StatusSet::all());
        assert_eq!("".parse::<StatusSet>().unwrap(), StatusSet::all());
        let set: StatusSet = "pending, resolved".parse().unwrap();
        assert!(set.contains(IssueStatus::Pending));
        assert!(!set.contains(IssueStatus::InProgress));
        assert_eq!(set.to_string(), "pending,resolved");
        assert!("pending,bogus".parse::<StatusSet>().is_err());
    }

    #[test]
    fn test_status_set_toggle() {
        let mut set = StatusSet::all();
        set.toggle(IssueStatus::Resolved);
        assert!(!set.contains(IssueStatus::Resolved));
        set.toggle(IssueStatus::Resolved);
        assert!(set.is_all());
    }
}

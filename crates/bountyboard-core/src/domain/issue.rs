//! Issues, lifecycle events and the severity taxonomy.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::IssueError;

/// `owner/name` coordinates of a repository on the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Key used by the admission queue for one issue of this repository.
    pub fn issue_key(&self, number: u64) -> String {
        format!("{}/{}#{}", self.owner, self.name, number)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(format!("expected `owner/name`, got `{s}`")),
        }
    }
}

/// A tracker account: assignee, bounty hunter or comment author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl User {
    /// A user known only by login.
    pub fn named(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            avatar_url: None,
            html_url: None,
        }
    }
}

/// CVSS band carried by an issue label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Recognise a label name, ignoring case and surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(label))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Weight used when averaging a contributor's severity mix.
    pub fn score(self) -> f64 {
        match self {
            Severity::Info => 0.0,
            Severity::Low => 2.0,
            Severity::Medium => 5.5,
            Severity::High => 9.0,
            Severity::Critical => 9.5,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("unknown severity `{s}`"))
    }
}

/// A tracked defect as seen by the tracker at request time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    /// Browser URL of the issue.
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignees: Vec<User>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Imported from the legacy bounty system; has no real event history.
    #[serde(default)]
    pub migrated: bool,
    /// Fixed bounty paid to the red team of a migrated issue.
    #[serde(default)]
    pub bounty_points: Option<f64>,
    /// Legacy bounty-hunter pseudonyms credited on a migrated issue.
    #[serde(default)]
    pub red_team: Vec<String>,
    #[serde(default)]
    pub is_pull_request: bool,
}

impl Issue {
    /// Every recognised severity label on the issue, deduplicated, in label order.
    pub fn severity_labels(&self) -> Vec<Severity> {
        let mut found = Vec::new();
        for severity in self.labels.iter().filter_map(|l| Severity::from_label(l)) {
            if !found.contains(&severity) {
                found.push(severity);
            }
        }
        found
    }

    /// The single severity of a scoreable issue.
    pub fn severity(&self) -> Result<Severity, IssueError> {
        let labels = self.severity_labels();
        match labels.as_slice() {
            [single] => Ok(*single),
            [] => Err(IssueError::IssueMissingSeverityLabel {
                number: self.number,
            }),
            _ => Err(IssueError::IssueMultipleSeverityLabels {
                number: self.number,
                labels,
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    pub fn has_assignee(&self) -> bool {
        !self.assignees.is_empty()
    }

    /// Time from opening to closing, if the issue is closed.
    pub fn time_to_disclosure(&self) -> Option<Duration> {
        self.closed_at.map(|closed| closed - self.created_at)
    }
}

/// Lifecycle action carried by an [`IssueEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Assigned,
    Unassigned,
    Reopened,
    Closed,
    Labeled,
    Unlabeled,
    #[serde(other)]
    Other,
}

impl EventAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "assigned" => EventAction::Assigned,
            "unassigned" => EventAction::Unassigned,
            "reopened" => EventAction::Reopened,
            "closed" => EventAction::Closed,
            "labeled" => EventAction::Labeled,
            "unlabeled" => EventAction::Unlabeled,
            _ => EventAction::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventAction::Assigned => "assigned",
            EventAction::Unassigned => "unassigned",
            EventAction::Reopened => "reopened",
            EventAction::Closed => "closed",
            EventAction::Labeled => "labeled",
            EventAction::Unlabeled => "unlabeled",
            EventAction::Other => "other",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an issue's event log. Timestamps are not unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueEvent {
    pub id: u64,
    pub action: EventAction,
    #[serde(default)]
    pub assignee: Option<User>,
    pub created_at: DateTime<Utc>,
}

/// An issue together with the data fetched for it during enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedIssue {
    pub issue: Issue,
    pub events: Vec<IssueEvent>,
    #[serde(default)]
    pub linked_pull_requests: Vec<u64>,
}

impl EnrichedIssue {
    pub fn new(issue: Issue, events: Vec<IssueEvent>) -> Self {
        Self {
            issue,
            events,
            linked_pull_requests: Vec::new(),
        }
    }
}

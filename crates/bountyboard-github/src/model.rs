//! GitHub REST payloads and their mapping onto Bountyboard's domain.
//!
//! Only the fields Bountyboard reads are declared; serde ignores the rest.

use std::sync::OnceLock;

use bountyboard_core::domain::{Comment, EventAction, Issue, IssueEvent, User};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Label carried by issues imported from the legacy bounty system.
pub const MIGRATED_LABEL: &str = "migrated";

/// Author shown for comments whose account was deleted.
pub const GHOST_LOGIN: &str = "ghost";

const BOUNTY_MARKER_PATTERN: &str = r"(?s)<!--\s*bounty:\s*(\{.*?\})\s*-->";

fn bounty_marker_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BOUNTY_MARKER_PATTERN).ok()).as_ref()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl From<ApiUser> for User {
    fn from(u: ApiUser) -> Self {
        User {
            login: u.login,
            avatar_url: u.avatar_url,
            html_url: u.html_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiIssue {
    pub id: u64,
    pub number: u64,
    pub html_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignees: Vec<ApiUser>,
    #[serde(default)]
    pub labels: Vec<ApiLabel>,
    /// Present (with link fields) only on pull requests.
    #[serde(default)]
    pub pull_request: Option<Value>,
}

/// Red-team metadata embedded in a migrated issue's body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BountyMarker {
    pub points: f64,
    #[serde(default)]
    pub hunters: Vec<String>,
}

impl BountyMarker {
    /// The first well-formed marker in `body`.
    pub fn parse(body: &str) -> Option<Self> {
        let captures = bounty_marker_regex()?.captures(body)?;
        match serde_json::from_str(captures.get(1)?.as_str()) {
            Ok(marker) => Some(marker),
            Err(e) => {
                warn!(error = %e, "ignoring malformed bounty marker");
                None
            }
        }
    }

    pub fn render(&self) -> String {
        format!(
            "<!-- bounty: {} -->",
            serde_json::json!({ "points": self.points, "hunters": self.hunters })
        )
    }
}

impl From<ApiIssue> for Issue {
    fn from(api: ApiIssue) -> Self {
        let migrated = api
            .labels
            .iter()
            .any(|l| l.name.trim().eq_ignore_ascii_case(MIGRATED_LABEL));
        let marker = match (migrated, api.body.as_deref()) {
            (true, Some(body)) => BountyMarker::parse(body),
            _ => None,
        };
        let (bounty_points, red_team) = match marker {
            Some(m) => (Some(m.points), m.hunters),
            None => (None, Vec::new()),
        };

        Issue {
            id: api.id,
            number: api.number,
            url: api.html_url,
            title: api.title,
            created_at: api.created_at,
            closed_at: api.closed_at,
            assignees: api.assignees.into_iter().map(User::from).collect(),
            labels: api.labels.into_iter().map(|l| l.name).collect(),
            migrated,
            bounty_points,
            red_team,
            is_pull_request: api.pull_request.is_some(),
        }
    }
}

/// Entry of `GET /repos/{owner}/{repo}/issues/{number}/events`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiIssueEvent {
    pub id: u64,
    pub event: String,
    #[serde(default)]
    pub assignee: Option<ApiUser>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiIssueEvent> for IssueEvent {
    fn from(api: ApiIssueEvent) -> Self {
        IssueEvent {
            id: api.id,
            action: EventAction::parse(&api.event),
            assignee: api.assignee.map(User::from),
            created_at: api.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiComment {
    pub id: u64,
    #[serde(default)]
    pub user: Option<ApiUser>,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiComment> for Comment {
    fn from(api: ApiComment) -> Self {
        Comment {
            id: api.id,
            author: api
                .user
                .map(|u| u.login)
                .unwrap_or_else(|| GHOST_LOGIN.to_string()),
            body: api.body.unwrap_or_default(),
            created_at: api.created_at,
        }
    }
}

/// Entry of the issue timeline. Entries differ wildly in shape, so
/// everything but the event name is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTimelineEvent {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub source: Option<ApiTimelineSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTimelineSource {
    #[serde(default)]
    pub issue: Option<ApiSourceIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSourceIssue {
    pub number: u64,
    #[serde(default)]
    pub pull_request: Option<Value>,
}

/// Numbers of pull requests that cross-reference the issue, sorted and
/// deduplicated.
pub fn linked_pull_requests(timeline: Vec<ApiTimelineEvent>) -> Vec<u64> {
    let mut numbers: Vec<u64> = timeline
        .into_iter()
        .filter(|e| e.event.as_deref() == Some("cross-referenced"))
        .filter_map(|e| e.source?.issue)
        .filter(|issue| issue.pull_request.is_some())
        .map(|issue| issue.number)
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    numbers
}

/// Request body for creating or editing a comment.
#[derive(Debug, Serialize)]
pub struct CommentBody<'a> {
    pub body: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api_issue(labels: &[&str], body: &str) -> ApiIssue {
        serde_json::from_value(json!({
            "id": 9001,
            "number": 42,
            "html_url": "https://github.com/acme/web/issues/42",
            "title": "Stored XSS",
            "body": body,
            "created_at": "2026-03-01T10:00:00Z",
            "closed_at": "2026-03-04T10:00:00Z",
            "assignees": [{ "login": "alice", "avatar_url": "https://a/alice.png" }],
            "labels": labels.iter().map(|l| json!({ "name": l })).collect::<Vec<_>>(),
            "state": "closed"
        }))
        .unwrap()
    }

    #[test]
    fn test_issue_maps_core_fields() {
        let issue: Issue = api_issue(&["high", "bug"], "steps").into();
        assert_eq!(issue.number, 42);
        assert_eq!(issue.assignees[0].login, "alice");
        assert_eq!(issue.labels, vec!["high", "bug"]);
        assert!(issue.is_closed());
        assert!(!issue.migrated);
        assert!(!issue.is_pull_request);
        assert!(issue.bounty_points.is_none());
    }

    #[test]
    fn test_migrated_issue_reads_bounty_marker() {
        let body = "Imported.\n<!-- bounty: {\"points\": 300, \"hunters\": [\"acid_burn\", \"zerocool\"]} -->\n";
        let issue: Issue = api_issue(&["Migrated", "critical"], body).into();
        assert!(issue.migrated);
        assert_eq!(issue.bounty_points, Some(300.0));
        assert_eq!(issue.red_team, vec!["acid_burn", "zerocool"]);
    }

    #[test]
    fn test_marker_ignored_without_migrated_label() {
        let body = "<!-- bounty: {\"points\": 300, \"hunters\": [\"x\"]} -->";
        let issue: Issue = api_issue(&["low"], body).into();
        assert!(issue.bounty_points.is_none());
        assert!(issue.red_team.is_empty());
    }

    #[test]
    fn test_malformed_marker_is_none() {
        assert!(BountyMarker::parse("<!-- bounty: {points: lots} -->").is_none());
        assert!(BountyMarker::parse("no marker here").is_none());
    }

    #[test]
    fn test_marker_render_parses_back() {
        let marker = BountyMarker {
            points: 125.5,
            hunters: vec!["phreak".into()],
        };
        assert_eq!(BountyMarker::parse(&marker.render()), Some(marker));
    }

    #[test]
    fn test_pull_request_flag() {
        let mut api = api_issue(&[], "");
        api.pull_request = Some(json!({ "url": "https://api.github.com/repos/acme/web/pulls/42" }));
        let issue: Issue = api.into();
        assert!(issue.is_pull_request);
    }

    #[test]
    fn test_event_and_comment_mapping() {
        let event: ApiIssueEvent = serde_json::from_value(json!({
            "id": 5,
            "event": "unassigned",
            "assignee": { "login": "bob" },
            "created_at": "2026-03-02T00:00:00Z"
        }))
        .unwrap();
        let event: IssueEvent = event.into();
        assert_eq!(event.action, EventAction::Unassigned);
        assert_eq!(event.assignee.unwrap().login, "bob");

        let comment: ApiComment = serde_json::from_value(json!({
            "id": 77,
            "user": null,
            "body": null,
            "created_at": "2026-03-02T00:00:00Z"
        }))
        .unwrap();
        let comment: Comment = comment.into();
        assert_eq!(comment.author, GHOST_LOGIN);
        assert_eq!(comment.body, "");
    }

    #[test]
    fn test_linked_pull_requests_from_timeline() {
        let timeline: Vec<ApiTimelineEvent> = serde_json::from_value(json!([
            { "event": "labeled", "label": { "name": "high" } },
            { "event": "cross-referenced", "source": { "type": "issue", "issue": { "number": 9, "pull_request": {} } } },
            { "event": "cross-referenced", "source": { "type": "issue", "issue": { "number": 3 } } },
            { "event": "cross-referenced", "source": { "type": "issue", "issue": { "number": 7, "pull_request": {} } } },
            { "event": "cross-referenced", "source": { "type": "issue", "issue": { "number": 9, "pull_request": {} } } },
            { "event": "committed", "sha": "abc" }
        ]))
        .unwrap();
        assert_eq!(linked_pull_requests(timeline), vec![7, 9]);
    }
}

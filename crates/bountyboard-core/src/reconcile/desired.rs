//! Desired bodies of the managed comments.

use std::fmt::Write as _;

use crate::config::BountyConfig;
use crate::domain::{CommentKind, EnrichedIssue, Issue, IssueError, Severity};
use crate::ledger::{BlueTeam, IssueScore};
use crate::reconcile::marker::CommentHeader;

/// Prerequisites checked by the Eligible comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    pub has_assignee: bool,
    pub severity_labels: Vec<Severity>,
    pub is_closed: bool,
}

impl Eligibility {
    pub fn of(issue: &Issue) -> Self {
        Self {
            has_assignee: issue.has_assignee(),
            severity_labels: issue.severity_labels(),
            is_closed: issue.is_closed(),
        }
    }

    pub fn has_single_severity(&self) -> bool {
        self.severity_labels.len() == 1
    }

    pub fn is_eligible(&self) -> bool {
        self.has_assignee && self.has_single_severity()
    }
}

/// Why no reward table could be produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Ineligibility {
    MissingAssignee,
    MissingSeverityLabel,
    MultipleSeverityLabels(Vec<Severity>),
    IssueOpen,
    NoContributors,
    InsufficientData(String),
    MissingData(String),
}

impl Ineligibility {
    fn from_issue_error(error: &IssueError) -> Self {
        match error {
            IssueError::IssueMissingClosedAt { .. } => Ineligibility::IssueOpen,
            IssueError::IssueMissingSeverityLabel { .. } => Ineligibility::MissingSeverityLabel,
            IssueError::IssueMultipleSeverityLabels { labels, .. } => {
                Ineligibility::MultipleSeverityLabels(labels.clone())
            }
            IssueError::NoContributors { .. } => Ineligibility::NoContributors,
            IssueError::InsufficientData { detail, .. } => {
                Ineligibility::InsufficientData(detail.clone())
            }
            IssueError::MissingData { field, .. } => Ineligibility::MissingData(field.clone()),
        }
    }

    pub fn explain(&self) -> String {
        match self {
            Ineligibility::MissingAssignee => "the issue has no assignee".to_string(),
            Ineligibility::MissingSeverityLabel => "the issue has no severity label".to_string(),
            Ineligibility::MultipleSeverityLabels(labels) => format!(
                "the issue has more than one severity label ({})",
                code_list(labels.iter().map(|s| s.as_str()))
            ),
            Ineligibility::IssueOpen => {
                "the issue is still open; the reward is computed once it is closed".to_string()
            }
            Ineligibility::NoContributors => {
                "nobody was assigned to the issue while it was open".to_string()
            }
            Ineligibility::InsufficientData(detail) => {
                format!("there is not enough data to compute it ({detail})")
            }
            Ineligibility::MissingData(field) => format!("the issue is missing `{field}`"),
        }
    }
}

/// Outcome of scoring one issue for its Reward comment.
#[derive(Debug, Clone, PartialEq)]
pub enum RewardState {
    Scored(IssueScore),
    Ineligible(Ineligibility),
}

impl RewardState {
    /// Eligibility is checked before the issue is scored, so the explanation
    /// names the first thing a maintainer has to fix.
    pub fn evaluate(enriched: &EnrichedIssue, blue: &BlueTeam<'_>) -> Self {
        let issue = &enriched.issue;
        let eligibility = Eligibility::of(issue);
        if !eligibility.has_assignee {
            return RewardState::Ineligible(Ineligibility::MissingAssignee);
        }
        match eligibility.severity_labels.len() {
            0 => return RewardState::Ineligible(Ineligibility::MissingSeverityLabel),
            1 => {}
            _ => {
                return RewardState::Ineligible(Ineligibility::MultipleSeverityLabels(
                    eligibility.severity_labels,
                ))
            }
        }
        if !issue.is_closed() {
            return RewardState::Ineligible(Ineligibility::IssueOpen);
        }
        match blue.score_issue(enriched) {
            Ok(score) => RewardState::Scored(score),
            Err(e) => RewardState::Ineligible(Ineligibility::from_issue_error(&e)),
        }
    }
}

/// The body each managed comment should have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredComments {
    pub eligible: String,
    pub reward: String,
}

impl DesiredComments {
    pub fn body(&self, kind: CommentKind) -> &str {
        match kind {
            CommentKind::Eligible => &self.eligible,
            CommentKind::Reward => &self.reward,
        }
    }
}

/// Renders managed bodies with the configured header version and currency.
#[derive(Debug, Clone)]
pub struct CommentRenderer {
    schema_version: String,
    currency: String,
}

impl CommentRenderer {
    pub fn new(schema_version: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            schema_version: schema_version.into(),
            currency: currency.into(),
        }
    }

    pub fn from_config(config: &BountyConfig) -> Self {
        Self::new(
            config.comments.schema_version.clone(),
            config.reward.currency.clone(),
        )
    }

    pub fn render(&self, enriched: &EnrichedIssue, state: &RewardState) -> DesiredComments {
        DesiredComments {
            eligible: self.render_eligible(&Eligibility::of(&enriched.issue)),
            reward: self.render_reward(state, &enriched.linked_pull_requests),
        }
    }

    pub fn render_eligible(&self, eligibility: &Eligibility) -> String {
        let mut body = self.header(CommentKind::Eligible);
        body.push_str("### Reward eligibility\n\n");
        let _ = writeln!(
            body,
            "- [{}] An assignee is set on the issue",
            check(eligibility.has_assignee)
        );
        let _ = writeln!(
            body,
            "- [{}] Exactly one severity label is set ({})",
            check(eligibility.has_single_severity()),
            code_list(Severity::ALL.iter().map(|s| s.as_str()))
        );
        body.push('\n');
        if !eligibility.is_eligible() {
            body.push_str(
                "Complete the unchecked items to make this issue eligible for a reward.\n",
            );
        } else if eligibility.is_closed {
            body.push_str("This issue is eligible for a reward.\n");
        } else {
            body.push_str("This issue is eligible for a reward once it is closed.\n");
        }
        body
    }

    pub fn render_reward(&self, state: &RewardState, linked_pull_requests: &[u64]) -> String {
        let mut body = self.header(CommentKind::Reward);
        body.push_str("### Reward summary\n\n");
        match state {
            RewardState::Ineligible(reason) => {
                let _ = writeln!(body, "No reward has been computed: {}.", reason.explain());
            }
            RewardState::Scored(score) => {
                let _ = write!(
                    body,
                    "This `{}` severity issue pays **{}** in total",
                    score.severity,
                    self.amount(score.total)
                );
                match score.reopen_count {
                    0 => body.push_str(".\n\n"),
                    1 => body.push_str(" (reopened once).\n\n"),
                    n => {
                        let _ = write!(body, " (reopened {n} times).\n\n");
                    }
                }

                body.push_str("| Contributor | Time worked | Reward |\n");
                body.push_str("| --- | --- | --- |\n");
                let mut shares: Vec<_> = score.shares.iter().collect();
                shares.sort_by(|a, b| {
                    b.amount
                        .total_cmp(&a.amount)
                        .then_with(|| a.login.cmp(&b.login))
                });
                for share in shares {
                    let _ = writeln!(
                        body,
                        "| @{} | {} | {} |",
                        share.login,
                        format_duration(share.worked_seconds),
                        self.amount(share.amount)
                    );
                }
            }
        }
        if !linked_pull_requests.is_empty() {
            let prs: Vec<String> = linked_pull_requests.iter().map(|n| format!("#{n}")).collect();
            let _ = write!(body, "\nLinked pull requests: {}\n", prs.join(", "));
        }
        body
    }

    fn header(&self, kind: CommentKind) -> String {
        let mut header = CommentHeader::new(kind, self.schema_version.clone()).render();
        header.push('\n');
        header
    }

    fn amount(&self, value: f64) -> String {
        format!("{value:.2} {}", self.currency)
    }
}

fn check(done: bool) -> char {
    if done {
        'x'
    } else {
        ' '
    }
}

fn code_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.map(|s| format!("`{s}`")).collect::<Vec<_>>().join(", ")
}

/// `1d 2h 5m`; zero components are left out, a zero duration is `0m`.
pub fn format_duration(seconds: i64) -> String {
    let minutes = seconds.max(0) / 60;
    let (days, hours, minutes) = (minutes / 1440, minutes / 60 % 24, minutes % 60);
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 || parts.is_empty() {
        parts.push(format!("{minutes}m"));
    }
    parts.join(" ")
}

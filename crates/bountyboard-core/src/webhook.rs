//! Webhook deliveries from the tracker.
//!
//! Only the fields needed to route a delivery are modelled. Signature
//! checking belongs to the transport (see `bountyboard-github`).

use serde::{Deserialize, Serialize};

use crate::domain::{BountyError, RepoRef, Result};
use crate::reconcile::{CommentMatcher, IssueReconciliation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookUser {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRepository {
    /// `owner/name`
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookIssue {
    pub number: u64,
    /// Present when the "issue" is really a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookComment {
    pub id: u64,
    pub user: WebhookUser,
}

/// An `issues` or `issue_comment` delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub action: String,
    #[serde(default)]
    pub issue: Option<WebhookIssue>,
    pub repository: WebhookRepository,
    #[serde(default)]
    pub sender: Option<WebhookUser>,
    #[serde(default)]
    pub comment: Option<WebhookComment>,
}

/// Delivery actions that can change what the managed comments should say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookAction {
    Opened,
    Edited,
    Closed,
    Reopened,
    Assigned,
    Unassigned,
    Labeled,
    Unlabeled,
    Created,
    Deleted,
}

impl WebhookAction {
    pub fn parse(action: &str) -> Option<Self> {
        Some(match action {
            "opened" => WebhookAction::Opened,
            "edited" => WebhookAction::Edited,
            "closed" => WebhookAction::Closed,
            "reopened" => WebhookAction::Reopened,
            "assigned" => WebhookAction::Assigned,
            "unassigned" => WebhookAction::Unassigned,
            "labeled" => WebhookAction::Labeled,
            "unlabeled" => WebhookAction::Unlabeled,
            "created" => WebhookAction::Created,
            "deleted" => WebhookAction::Deleted,
            _ => return None,
        })
    }

    fn applies_to_issue(self) -> bool {
        !matches!(self, WebhookAction::Created | WebhookAction::Deleted)
    }

    fn applies_to_comment(self) -> bool {
        matches!(
            self,
            WebhookAction::Created | WebhookAction::Edited | WebhookAction::Deleted
        )
    }
}

/// Why a delivery was not acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    UnhandledAction(String),
    NoIssue,
    PullRequest,
    BotComment,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoreReason::UnhandledAction(action) => write!(f, "unhandled action `{action}`"),
            IgnoreReason::NoIssue => f.write_str("delivery carries no issue"),
            IgnoreReason::PullRequest => f.write_str("pull requests carry no managed comments"),
            IgnoreReason::BotComment => f.write_str("comment written by the bot itself"),
        }
    }
}

/// Routing decision for one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDisposition {
    Reconcile { repo: RepoRef, number: u64 },
    Ignore(IgnoreReason),
}

/// What handling a delivery did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Reconciled(IssueReconciliation),
    Ignored { reason: IgnoreReason },
}

impl WebhookEvent {
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| BountyError::InvalidWebhook(e.to_string()))
    }

    pub fn repo(&self) -> Result<RepoRef> {
        self.repository
            .full_name
            .parse()
            .map_err(BountyError::InvalidWebhook)
    }

    /// Decide what to do with the delivery.
    ///
    /// Comment deliveries only matter when someone other than the bot acted,
    /// since they may have removed or edited a managed comment.
    pub fn classify(&self, matcher: &CommentMatcher) -> Result<WebhookDisposition> {
        let Some(action) = WebhookAction::parse(&self.action) else {
            return Ok(WebhookDisposition::Ignore(IgnoreReason::UnhandledAction(
                self.action.clone(),
            )));
        };
        let Some(issue) = &self.issue else {
            return Ok(WebhookDisposition::Ignore(IgnoreReason::NoIssue));
        };
        if issue.pull_request.is_some() {
            return Ok(WebhookDisposition::Ignore(IgnoreReason::PullRequest));
        }

        match &self.comment {
            Some(comment) => {
                if !action.applies_to_comment() {
                    return Ok(WebhookDisposition::Ignore(IgnoreReason::UnhandledAction(
                        self.action.clone(),
                    )));
                }
                let actor = self.sender.as_ref().unwrap_or(&comment.user);
                if matcher.is_bot(&actor.login) {
                    return Ok(WebhookDisposition::Ignore(IgnoreReason::BotComment));
                }
            }
            None if !action.applies_to_issue() => {
                return Ok(WebhookDisposition::Ignore(IgnoreReason::UnhandledAction(
                    self.action.clone(),
                )));
            }
            None => {}
        }

        Ok(WebhookDisposition::Reconcile {
            repo: self.repo()?,
            number: issue.number,
        })
    }
}

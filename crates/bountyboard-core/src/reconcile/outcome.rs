//! What a reconciliation run did to an issue's comments.

use serde::{Deserialize, Serialize};

use crate::domain::CommentKind;

/// Why an existing comment's body was rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateReason {
    BodyChanged,
    Reordered,
}

/// A single successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CommentAction {
    Created { comment_id: u64 },
    Updated { comment_id: u64, reason: UpdateReason },
    Deleted { comment_id: u64 },
}

impl CommentAction {
    pub fn name(&self) -> &'static str {
        match self {
            CommentAction::Created { .. } => "created",
            CommentAction::Updated { .. } => "updated",
            CommentAction::Deleted { .. } => "deleted",
        }
    }

    pub fn comment_id(&self) -> u64 {
        match self {
            CommentAction::Created { comment_id }
            | CommentAction::Updated { comment_id, .. }
            | CommentAction::Deleted { comment_id } => *comment_id,
        }
    }
}

/// Writes and failures for one comment kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindOutcome {
    pub kind: CommentKind,
    /// Comment holding this kind's body after the run, if any.
    pub comment_id: Option<u64>,
    pub actions: Vec<CommentAction>,
    pub errors: Vec<String>,
}

impl KindOutcome {
    pub fn new(kind: CommentKind) -> Self {
        Self {
            kind,
            comment_id: None,
            actions: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn count(&self, name: &str) -> usize {
        self.actions.iter().filter(|a| a.name() == name).count()
    }
}

/// Per-issue report, one [`KindOutcome`] per managed kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueReconciliation {
    pub repository: String,
    pub number: u64,
    pub eligible: KindOutcome,
    pub reward: KindOutcome,
}

impl IssueReconciliation {
    pub fn new(repository: impl Into<String>, number: u64) -> Self {
        Self {
            repository: repository.into(),
            number,
            eligible: KindOutcome::new(CommentKind::Eligible),
            reward: KindOutcome::new(CommentKind::Reward),
        }
    }

    pub fn outcome(&self, kind: CommentKind) -> &KindOutcome {
        match kind {
            CommentKind::Eligible => &self.eligible,
            CommentKind::Reward => &self.reward,
        }
    }

    pub fn outcome_mut(&mut self, kind: CommentKind) -> &mut KindOutcome {
        match kind {
            CommentKind::Eligible => &mut self.eligible,
            CommentKind::Reward => &mut self.reward,
        }
    }

    pub fn action_count(&self) -> usize {
        self.eligible.actions.len() + self.reward.actions.len()
    }

    pub fn error_count(&self) -> usize {
        self.eligible.errors.len() + self.reward.errors.len()
    }

    /// Nothing was written and nothing failed.
    pub fn is_noop(&self) -> bool {
        self.action_count() == 0 && self.error_count() == 0
    }

    pub fn created(&self) -> usize {
        self.eligible.count("created") + self.reward.count("created")
    }

    pub fn updated(&self) -> usize {
        self.eligible.count("updated") + self.reward.count("updated")
    }

    pub fn deleted(&self) -> usize {
        self.eligible.count("deleted") + self.reward.count("deleted")
    }
}

/// Reconciliation of a whole repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryReconciliation {
    pub repository: String,
    pub issues: Vec<IssueReconciliation>,
    /// Issues that could not be reconciled at all, with the reason.
    pub failures: Vec<IssueFailure>,
}

/// An issue whose data could not be fetched for reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueFailure {
    pub number: u64,
    pub error: String,
}

impl RepositoryReconciliation {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            issues: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn action_count(&self) -> usize {
        self.issues.iter().map(IssueReconciliation::action_count).sum()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .map(IssueReconciliation::error_count)
            .sum::<usize>()
            + self.failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_span_both_kinds() {
        let mut report = IssueReconciliation::new("acme/web", 3);
        assert!(report.is_noop());

        report.eligible.actions.push(CommentAction::Deleted { comment_id: 9 });
        report.reward.actions.push(CommentAction::Updated {
            comment_id: 4,
            reason: UpdateReason::Reordered,
        });
        report.reward.errors.push("boom".into());

        assert_eq!(report.action_count(), 2);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.deleted(), 1);
        assert_eq!(report.updated(), 1);
        assert_eq!(report.created(), 0);
        assert!(!report.is_noop());
        assert!(!report.outcome(CommentKind::Reward).is_ok());
    }

    #[test]
    fn test_action_serializes_tagged() {
        let json = serde_json::to_value(CommentAction::Created { comment_id: 5 }).unwrap();
        assert_eq!(json["action"], "created");
        assert_eq!(json["comment_id"], 5);
    }
}

//! Error taxonomy for Bountyboard.

use super::issue::Severity;
use crate::config::ConfigError;
use crate::tracker::TrackerError;

/// Per-issue problems. These exclude one issue from a computation and
/// are explained to users through the Reward comment; they never abort
/// a batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IssueError {
    #[error("issue #{number} is missing required field `{field}`")]
    MissingData { number: u64, field: String },

    #[error("issue #{number} has no closed_at timestamp")]
    IssueMissingClosedAt { number: u64 },

    #[error("issue #{number} has no severity label")]
    IssueMissingSeverityLabel { number: u64 },

    #[error("issue #{number} has multiple severity labels: {labels:?}")]
    IssueMultipleSeverityLabels { number: u64, labels: Vec<Severity> },

    #[error("issue #{number} has no contributors")]
    NoContributors { number: u64 },

    #[error("issue #{number} has insufficient data: {detail}")]
    InsufficientData { number: u64, detail: String },
}

impl IssueError {
    pub fn number(&self) -> u64 {
        match self {
            IssueError::MissingData { number, .. }
            | IssueError::IssueMissingClosedAt { number }
            | IssueError::IssueMissingSeverityLabel { number }
            | IssueError::IssueMultipleSeverityLabels { number, .. }
            | IssueError::NoContributors { number }
            | IssueError::InsufficientData { number, .. } => *number,
        }
    }
}

/// Top-level Bountyboard errors.
#[derive(Debug, thiserror::Error)]
pub enum BountyError {
    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("issue error: {0}")]
    Issue(#[from] IssueError),

    #[error("timed out after {waited_ms}ms waiting for admission to {key}")]
    AdmissionTimeout { key: String, waited_ms: u64 },

    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),

    #[error("background task failed: {0}")]
    TaskJoin(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Bountyboard operations.
pub type Result<T> = std::result::Result<T, BountyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_error_display_names_issue() {
        let err = IssueError::IssueMultipleSeverityLabels {
            number: 12,
            labels: vec![Severity::Low, Severity::High],
        };
        let msg = err.to_string();
        assert!(msg.contains("#12"));
        assert!(msg.contains("Low"));
        assert_eq!(err.number(), 12);
    }

    #[test]
    fn test_admission_timeout_display() {
        let err = BountyError::AdmissionTimeout {
            key: "acme/web#4".to_string(),
            waited_ms: 1500,
        };
        let msg = err.to_string();
        assert!(msg.contains("acme/web#4"));
        assert!(msg.contains("1500ms"));
    }

    #[test]
    fn test_issue_error_converts_into_bounty_error() {
        let err: BountyError = IssueError::NoContributors { number: 3 }.into();
        assert!(err.to_string().contains("no contributors"));
    }
}

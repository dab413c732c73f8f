//! Bountyboard domain model.
//!
//! Everything here is rebuilt per request from tracker snapshots; nothing
//! is persisted.

pub mod comment;
pub mod contributor;
pub mod error;
pub mod issue;
pub mod worklog;

pub use comment::{Comment, CommentKind};
pub use contributor::{month_bucket, Contributor, RewardEvent, SeverityHistogram, MONTH_WINDOW};
pub use error::{BountyError, IssueError, Result};
pub use issue::{EnrichedIssue, EventAction, Issue, IssueEvent, RepoRef, Severity, User};
pub use worklog::{WorkLog, WorkLogs};

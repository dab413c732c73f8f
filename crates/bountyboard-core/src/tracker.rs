//! The issue tracker seam.
//!
//! Everything Bountyboard reads from or writes to the tracker goes through
//! [`IssueTracker`]. Implement it for a real API (see `bountyboard-github`),
//! or use [`crate::fakes::MemoryTracker`] in tests.

use async_trait::async_trait;

use crate::domain::{Comment, Issue, IssueEvent, RepoRef};

/// Transport-level failures talking to the tracker.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited by tracker (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("tracker responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode tracker payload: {0}")]
    Decode(String),
}

pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

/// Read and write access to issues and their comments.
///
/// None of the write primitives are assumed to be atomic or transactional
/// across calls.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// All issues of a repository, open and closed.
    async fn list_issues(&self, repo: &RepoRef) -> TrackerResult<Vec<Issue>>;

    async fn get_issue(&self, repo: &RepoRef, number: u64) -> TrackerResult<Issue>;

    /// The issue's event log in the order the tracker recorded it.
    async fn list_issue_events(&self, repo: &RepoRef, number: u64)
        -> TrackerResult<Vec<IssueEvent>>;

    /// Numbers of pull requests that reference the issue.
    async fn list_linked_pull_requests(&self, repo: &RepoRef, number: u64)
        -> TrackerResult<Vec<u64>>;

    async fn list_comments(&self, repo: &RepoRef, number: u64) -> TrackerResult<Vec<Comment>>;

    async fn create_comment(&self, repo: &RepoRef, number: u64, body: &str)
        -> TrackerResult<Comment>;

    async fn update_comment(&self, repo: &RepoRef, comment_id: u64, body: &str)
        -> TrackerResult<Comment>;

    async fn delete_comment(&self, repo: &RepoRef, comment_id: u64) -> TrackerResult<()>;
}

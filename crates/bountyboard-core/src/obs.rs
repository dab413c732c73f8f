//! Structured observability hooks for scoring and comment reconciliation.
//!
//! This module provides:
//! - Request-scoped tracing spans via [`request_span`]
//! - Emission functions for issue scoring, comment actions and webhooks
//!
//! Events are emitted at `info!` level; failures at `warn!`.

use tracing::{info, Span};
use uuid::Uuid;

use crate::domain::{CommentKind, IssueError};
use crate::metrics::METRICS;

/// Request-scoped span carrying a fresh `request_id`.
///
/// Attach it to an entry point's future with [`tracing::Instrument`] so the
/// future stays `Send`:
///
/// ```ignore
/// async { /* ... */ }.instrument(request_span("list_blue_team")).await
/// ```
pub fn request_span(operation: &str) -> Span {
    let request_id = Uuid::new_v4();
    tracing::info_span!(
        "bountyboard.request",
        request_id = %request_id,
        operation = %operation
    )
}

/// Emit event: an issue's reward was computed.
pub fn emit_issue_scored(number: u64, total: f64, contributors: usize) {
    METRICS.inc_issues_scored();
    info!(
        event = "issue.scored",
        issue = number,
        total = total,
        contributors = contributors,
    );
}

/// Emit event: an issue was excluded from an aggregate.
pub fn emit_issue_skipped(number: u64, reason: &IssueError) {
    METRICS.inc_issues_skipped();
    info!(event = "issue.skipped", issue = number, reason = %reason);
}

/// Emit event: a comment write succeeded.
pub fn emit_comment_action(
    repo: &str,
    number: u64,
    kind: CommentKind,
    action: &str,
    comment_id: u64,
) {
    METRICS.inc_comment_actions();
    info!(
        event = "comment.action",
        repo = %repo,
        issue = number,
        kind = %kind,
        action = %action,
        comment_id = comment_id,
    );
}

/// Emit event: a comment write failed (warning level).
pub fn emit_comment_error(
    repo: &str,
    number: u64,
    kind: CommentKind,
    error: &dyn std::fmt::Display,
) {
    METRICS.inc_comment_errors();
    tracing::warn!(
        event = "comment.error",
        repo = %repo,
        issue = number,
        kind = %kind,
        error = %error,
    );
}

/// Emit event: reconciliation of one issue finished.
pub fn emit_reconciled(repo: &str, number: u64, actions: usize, errors: usize) {
    info!(
        event = "issue.reconciled",
        repo = %repo,
        issue = number,
        actions = actions,
        errors = errors,
    );
}

/// Emit event: a webhook delivery was received.
pub fn emit_webhook_received(action: &str, repo: &str, number: Option<u64>) {
    METRICS.inc_webhooks();
    info!(
        event = "webhook.received",
        action = %action,
        repo = %repo,
        issue = ?number,
    );
}

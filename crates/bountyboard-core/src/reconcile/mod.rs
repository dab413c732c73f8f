//! Comment reconciliation: the bot keeps exactly one Eligible and one
//! Reward comment on every issue, Eligible first, with up-to-date bodies.
//!
//! - [`marker`] decides which existing comments the bot owns.
//! - [`desired`] renders the bodies those comments should have.
//! - [`engine::CommentReconciler`] issues the writes.
//! - [`outcome`] records what happened, per issue and per kind.

pub mod desired;
pub mod engine;
pub mod marker;
pub mod outcome;

pub use desired::{
    format_duration, CommentRenderer, DesiredComments, Eligibility, Ineligibility, RewardState,
};
pub use engine::CommentReconciler;
pub use marker::{CommentHeader, CommentMatcher, ManagedComment, MatchRule};
pub use outcome::{
    CommentAction, IssueFailure, IssueReconciliation, KindOutcome, RepositoryReconciliation,
    UpdateReason,
};

//! Bountyboard Core Library
//!
//! Reward computation for security issues and the status comments the bot
//! keeps on them. The tracker is reached only through
//! [`tracker::IssueTracker`]; `bountyboard-github` provides the real one.

pub mod admission;
pub mod config;
pub mod curve;
pub mod domain;
pub mod enrich;
pub mod fakes;
pub mod identity;
pub mod ledger;
pub mod metrics;
pub mod obs;
pub mod reconcile;
pub mod service;
pub mod telemetry;
pub mod timeline;
pub mod tracker;
pub mod webhook;

pub use admission::{AdmissionPermit, IssueAdmissionQueue};
pub use config::{
    BountyConfig, CommentConfig, ConfigError, RewardConfig, RuntimeConfig, SeverityWeights,
};
pub use curve::RewardCurve;
pub use domain::{
    BountyError, Comment, CommentKind, Contributor, EnrichedIssue, EventAction, Issue, IssueError,
    IssueEvent, RepoRef, Result, RewardEvent, Severity, SeverityHistogram, User, WorkLog, WorkLogs,
    MONTH_WINDOW,
};
pub use enrich::{Enricher, EnrichmentFailure, EnrichmentReport};
pub use identity::{IdentityCache, IdentityResolver};
pub use ledger::{
    BlueTeam, ContributorLedger, IssueScore, Leaderboard, MappedIssue, RedTeam, RepositoryFailure,
    RewardShare, SkippedIssue,
};
pub use reconcile::{
    CommentAction, CommentMatcher, CommentReconciler, CommentRenderer, DesiredComments,
    IssueReconciliation, KindOutcome, RepositoryReconciliation, RewardState,
};
pub use service::BountyService;
pub use timeline::{EventTimeline, TimelineInput, TimelineOutcome, TimelineWarning};
pub use tracker::{IssueTracker, TrackerError, TrackerResult};
pub use webhook::{WebhookDisposition, WebhookEvent, WebhookOutcome};

pub use metrics::METRICS;
pub use obs::{
    emit_comment_action, emit_comment_error, emit_issue_scored, emit_issue_skipped,
    emit_reconciled, emit_webhook_received, request_span,
};
pub use telemetry::init_tracing;

/// Bountyboard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

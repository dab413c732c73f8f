//! Entry points: leaderboards, comment reconciliation and webhook handling.
//!
//! [`BountyService`] is cheap to clone. Clones share the tracker, the
//! identity cache and the admission queue; everything else is rebuilt per
//! request.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn, Instrument};

use crate::admission::IssueAdmissionQueue;
use crate::config::BountyConfig;
use crate::curve::RewardCurve;
use crate::domain::{BountyError, RepoRef, Result};
use crate::enrich::Enricher;
use crate::identity::{IdentityCache, IdentityResolver};
use crate::ledger::{BlueTeam, Leaderboard, RedTeam, RepositoryFailure, SkippedIssue};
use crate::obs;
use crate::reconcile::{
    CommentMatcher, CommentReconciler, CommentRenderer, IssueFailure, IssueReconciliation,
    RepositoryReconciliation, RewardState,
};
use crate::tracker::IssueTracker;
use crate::webhook::{WebhookDisposition, WebhookEvent, WebhookOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Teams {
    Blue,
    Red,
    Both,
}

impl Teams {
    fn blue(self) -> bool {
        matches!(self, Teams::Blue | Teams::Both)
    }

    fn red(self) -> bool {
        matches!(self, Teams::Red | Teams::Both)
    }
}

#[derive(Clone)]
pub struct BountyService {
    tracker: Arc<dyn IssueTracker>,
    resolver: Arc<dyn IdentityResolver>,
    config: Arc<BountyConfig>,
    admission: Arc<IssueAdmissionQueue>,
    identities: Arc<IdentityCache>,
    curve: RewardCurve,
    matcher: CommentMatcher,
    renderer: CommentRenderer,
    fixed_now: Option<DateTime<Utc>>,
}

impl BountyService {
    /// Service with a fresh identity cache and admission queue.
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        resolver: Arc<dyn IdentityResolver>,
        config: BountyConfig,
    ) -> Self {
        let timeout = config.runtime.admission_timeout_secs.map(Duration::from_secs);
        Self::with_shared(
            tracker,
            resolver,
            Arc::new(config),
            Arc::new(IssueAdmissionQueue::with_timeout(timeout)),
            Arc::new(IdentityCache::new()),
        )
    }

    /// Service sharing long-lived state with other instances.
    pub fn with_shared(
        tracker: Arc<dyn IssueTracker>,
        resolver: Arc<dyn IdentityResolver>,
        config: Arc<BountyConfig>,
        admission: Arc<IssueAdmissionQueue>,
        identities: Arc<IdentityCache>,
    ) -> Self {
        Self {
            curve: RewardCurve::new(&config.reward),
            matcher: CommentMatcher::from_config(&config.comments),
            renderer: CommentRenderer::from_config(&config),
            tracker,
            resolver,
            config,
            admission,
            identities,
            fixed_now: None,
        }
    }

    /// Pin the clock used for reward windows and open intervals.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.fixed_now = Some(now);
        self
    }

    pub fn config(&self) -> &BountyConfig {
        &self.config
    }

    pub fn admission(&self) -> &Arc<IssueAdmissionQueue> {
        &self.admission
    }

    pub fn identities(&self) -> &Arc<IdentityCache> {
        &self.identities
    }

    fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }

    fn currency(&self) -> &str {
        &self.config.reward.currency
    }

    fn enricher(&self) -> Enricher {
        Enricher::new(Arc::clone(&self.tracker), self.config.runtime.max_concurrency)
    }

    fn reconciler(&self) -> CommentReconciler {
        CommentReconciler::new(Arc::clone(&self.tracker), self.matcher.clone())
    }

    /// Blue and red teams merged into one ranking.
    pub async fn list_contributors(&self, repos: &[RepoRef]) -> Result<Leaderboard> {
        self.leaderboard(repos, Teams::Both)
            .instrument(obs::request_span("list_contributors"))
            .await
    }

    pub async fn list_blue_team(&self, repos: &[RepoRef]) -> Result<Leaderboard> {
        self.leaderboard(repos, Teams::Blue)
            .instrument(obs::request_span("list_blue_team"))
            .await
    }

    pub async fn list_red_team(&self, repos: &[RepoRef]) -> Result<Leaderboard> {
        self.leaderboard(repos, Teams::Red)
            .instrument(obs::request_span("list_red_team"))
            .await
    }

    /// Reconcile one issue, or every issue of `repo` when `number` is `None`.
    ///
    /// Per-issue failures are collected in the report; only a failure to
    /// list the repository's issues is returned as an error.
    pub async fn trigger_comment_update(
        &self,
        repo: &RepoRef,
        number: Option<u64>,
    ) -> Result<RepositoryReconciliation> {
        async {
            let mut report = RepositoryReconciliation::new(repo.to_string());
            match number {
                Some(number) => report.issues.push(self.reconcile_issue(repo, number).await?),
                None => self.reconcile_repository(repo, &mut report).await?,
            }
            info!(
                repo = %repo,
                issues = report.issues.len(),
                actions = report.action_count(),
                errors = report.error_count(),
                "comment update finished"
            );
            Ok::<_, BountyError>(report)
        }
        .instrument(obs::request_span("trigger_comment_update"))
        .await
    }

    /// Route a webhook delivery; issue changes reconcile that issue under
    /// its admission queue.
    pub async fn receive_webhook_event(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        async {
            obs::emit_webhook_received(
                &event.action,
                &event.repository.full_name,
                event.issue.as_ref().map(|i| i.number),
            );
            match event.classify(&self.matcher)? {
                WebhookDisposition::Ignore(reason) => {
                    debug!(action = %event.action, %reason, "ignoring webhook delivery");
                    Ok::<_, BountyError>(WebhookOutcome::Ignored { reason })
                }
                WebhookDisposition::Reconcile { repo, number } => Ok(WebhookOutcome::Reconciled(
                    self.reconcile_issue(&repo, number).await?,
                )),
            }
        }
        .instrument(obs::request_span("receive_webhook_event"))
        .await
    }

    /// Reconcile one issue once every earlier operation on it has finished.
    pub async fn reconcile_issue(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<IssueReconciliation> {
        let key = repo.issue_key(number);
        let _permit = self.admission.wait(&key).await?;
        self.reconcile_admitted(repo, number).await
    }

    async fn reconcile_admitted(&self, repo: &RepoRef, number: u64) -> Result<IssueReconciliation> {
        let issue = self.tracker.get_issue(repo, number).await?;
        if issue.is_pull_request {
            debug!(repo = %repo, issue = number, "pull request; nothing to reconcile");
            return Ok(IssueReconciliation::new(repo.to_string(), number));
        }

        let (enriched, comments) = futures::future::join(
            self.enricher().enrich_one(repo, issue),
            self.tracker.list_comments(repo, number),
        )
        .await;
        let (enriched, comments) = (enriched?, comments?);

        let blue = BlueTeam::new(&self.curve, self.now());
        let state = RewardState::evaluate(&enriched, &blue);
        let desired = self.renderer.render(&enriched, &state);
        Ok(self
            .reconciler()
            .reconcile(repo, number, comments, &desired)
            .await)
    }

    async fn reconcile_repository(
        &self,
        repo: &RepoRef,
        report: &mut RepositoryReconciliation,
    ) -> Result<()> {
        let issues = self.tracker.list_issues(repo).await?;
        let semaphore = Arc::new(Semaphore::new(self.config.runtime.max_concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for issue in issues.into_iter().filter(|i| !i.is_pull_request) {
            let service = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let repo = repo.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (issue.number, service.reconcile_issue(&repo, issue.number).await)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let (number, result) =
                joined.map_err(|e| BountyError::TaskJoin(format!("reconciliation task: {e}")))?;
            match result {
                Ok(issue) => report.issues.push(issue),
                Err(e) => {
                    warn!(repo = %repo, issue = number, error = %e, "could not reconcile issue");
                    report.failures.push(IssueFailure {
                        number,
                        error: e.to_string(),
                    });
                }
            }
        }
        report.issues.sort_by_key(|i| i.number);
        report.failures.sort_by_key(|f| f.number);
        Ok(())
    }

    /// Merge the boards of every repository. A repository that fails is
    /// listed in `failed_repositories`; the call only fails when all do.
    async fn leaderboard(&self, repos: &[RepoRef], teams: Teams) -> Result<Leaderboard> {
        let now = self.now();
        let results = join_all(
            repos
                .iter()
                .map(|repo| self.repository_board(repo, teams, now)),
        )
        .await;

        let mut boards = Vec::with_capacity(repos.len());
        let mut failures = Vec::new();
        let mut first_error = None;
        for (repo, result) in repos.iter().zip(results) {
            match result {
                Ok(board) => boards.push(board),
                Err(e) => {
                    warn!(repo = %repo, error = %e, "repository pass aborted");
                    failures.push(RepositoryFailure {
                        repository: repo.to_string(),
                        error: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                }
            }
        }
        if boards.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let mut merged = Leaderboard::merge(boards, self.currency(), now);
        merged.failed_repositories.extend(failures);
        Ok(merged)
    }

    async fn repository_board(
        &self,
        repo: &RepoRef,
        teams: Teams,
        now: DateTime<Utc>,
    ) -> Result<Leaderboard> {
        let issues = self.tracker.list_issues(repo).await?;
        let mut boards = Vec::with_capacity(2);

        if teams.red() {
            let red = RedTeam::new(&self.identities, self.resolver.as_ref(), now);
            boards.push(red.aggregate(&issues, self.currency()).await);
        }
        if teams.blue() {
            let report = self.enricher().enrich_all(repo, issues).await?;
            let mut board =
                BlueTeam::new(&self.curve, now).aggregate(&report.issues, self.currency());
            board.skipped.extend(report.failures.into_iter().map(|f| SkippedIssue {
                number: f.number,
                url: f.url,
                reason: f.error,
            }));
            boards.push(board);
        }

        Ok(Leaderboard::merge(boards, self.currency(), now))
    }
}

//! Fetching the per-issue data scoring needs.
//!
//! Each issue's event log and linked pull requests are fetched in its own
//! task; at most `max_concurrency` tasks are in flight at once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::{BountyError, EnrichedIssue, Issue, RepoRef, Result};
use crate::tracker::{IssueTracker, TrackerResult};

/// An issue whose data could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentFailure {
    pub number: u64,
    pub url: String,
    pub error: String,
}

/// Enriched issues in tracker order, plus the ones that failed.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    pub issues: Vec<EnrichedIssue>,
    pub failures: Vec<EnrichmentFailure>,
}

/// Bounded fan-out over the tracker.
pub struct Enricher {
    tracker: Arc<dyn IssueTracker>,
    max_concurrency: usize,
}

impl Enricher {
    pub fn new(tracker: Arc<dyn IssueTracker>, max_concurrency: usize) -> Self {
        Self {
            tracker,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Enrich one issue.
    pub async fn enrich_one(&self, repo: &RepoRef, issue: Issue) -> TrackerResult<EnrichedIssue> {
        enrich(self.tracker.as_ref(), repo, issue).await
    }

    /// Enrich every issue of `issues` that is not a pull request.
    ///
    /// A failing issue is reported and left out; the others are unaffected.
    pub async fn enrich_all(&self, repo: &RepoRef, issues: Vec<Issue>) -> Result<EnrichmentReport> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut join_set = JoinSet::new();

        let issues: Vec<Issue> = issues.into_iter().filter(|i| !i.is_pull_request).collect();
        let total = issues.len();
        for (idx, issue) in issues.into_iter().enumerate() {
            let tracker = Arc::clone(&self.tracker);
            let semaphore = Arc::clone(&semaphore);
            let repo = repo.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let (number, url) = (issue.number, issue.url.clone());
                (idx, number, url, enrich(tracker.as_ref(), &repo, issue).await)
            });
        }

        let mut slots: Vec<Option<EnrichedIssue>> = vec![None; total];
        let mut report = EnrichmentReport::default();
        while let Some(joined) = join_set.join_next().await {
            let (idx, number, url, result) =
                joined.map_err(|e| BountyError::TaskJoin(format!("enrichment task: {e}")))?;
            match result {
                Ok(enriched) => slots[idx] = Some(enriched),
                Err(e) => {
                    warn!(repo = %repo, issue = number, error = %e, "could not enrich issue");
                    report.failures.push(EnrichmentFailure {
                        number,
                        url,
                        error: e.to_string(),
                    });
                }
            }
        }
        report.issues = slots.into_iter().flatten().collect();
        report.failures.sort_by_key(|f| f.number);
        debug!(
            repo = %repo,
            enriched = report.issues.len(),
            failed = report.failures.len(),
            "enrichment finished"
        );
        Ok(report)
    }
}

async fn enrich(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    issue: Issue,
) -> TrackerResult<EnrichedIssue> {
    let (events, linked) = futures::future::join(
        tracker.list_issue_events(repo, issue.number),
        tracker.list_linked_pull_requests(repo, issue.number),
    )
    .await;
    let mut enriched = EnrichedIssue::new(issue, events?);
    enriched.linked_pull_requests = linked?;
    Ok(enriched)
}

//! Red team: fixed bounties of migrated legacy issues, split equally
//! between the credited bounty hunters.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::{Issue, IssueError, RewardEvent, User};
use crate::identity::{IdentityCache, IdentityResolver};
use crate::ledger::{ContributorLedger, Leaderboard, SkippedIssue};
use crate::obs;

/// Red-team scoring. Hunters are resolved through the shared cache.
pub struct RedTeam<'a> {
    identities: &'a IdentityCache,
    resolver: &'a dyn IdentityResolver,
    now: DateTime<Utc>,
}

impl<'a> RedTeam<'a> {
    pub fn new(
        identities: &'a IdentityCache,
        resolver: &'a dyn IdentityResolver,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            identities,
            resolver,
            now,
        }
    }

    /// Aggregate the bounties of every migrated issue in `issues`.
    /// Non-migrated issues are ignored.
    pub async fn aggregate(&self, issues: &[Issue], currency: &str) -> Leaderboard {
        let mut ledger = ContributorLedger::new(self.now);
        let mut board = Leaderboard::empty(currency, self.now);

        for issue in issues.iter().filter(|i| i.migrated) {
            match self.credit_issue(&mut ledger, issue).await {
                Ok(points) => {
                    obs::emit_issue_scored(issue.number, points, issue.red_team.len());
                    board.record_scored(&issue.url);
                    board.bounty_points += points;
                }
                Err(e) => {
                    warn!(issue = issue.number, error = %e, "excluding issue from red team");
                    obs::emit_issue_skipped(issue.number, &e);
                    board.skipped.push(SkippedIssue {
                        number: issue.number,
                        url: issue.url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        board.contributors = ledger.into_ranked();
        board
    }

    async fn credit_issue(
        &self,
        ledger: &mut ContributorLedger,
        issue: &Issue,
    ) -> Result<f64, IssueError> {
        let points = issue
            .bounty_points
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| IssueError::MissingData {
                number: issue.number,
                field: "bounty_points".to_string(),
            })?;

        let mut hunters: Vec<&str> = Vec::new();
        for pseudonym in issue.red_team.iter().map(|p| p.trim()) {
            if !pseudonym.is_empty()
                && !hunters.iter().any(|h| h.eq_ignore_ascii_case(pseudonym))
            {
                hunters.push(pseudonym);
            }
        }
        if hunters.is_empty() {
            return Err(IssueError::MissingData {
                number: issue.number,
                field: "red_team".to_string(),
            });
        }

        let share = points / hunters.len() as f64;
        let severity = issue.severity().ok();
        let disclosure = issue.time_to_disclosure().map(|d| d.num_minutes());
        let date = issue.closed_at.unwrap_or(issue.created_at);

        for pseudonym in hunters {
            let user = self.identify(pseudonym).await;
            let now = ledger.now();
            let contributor = ledger.contributor_mut(&user);
            contributor.record_fix(severity, disclosure);
            contributor.add_reward(
                RewardEvent {
                    date,
                    amount: share,
                    issue_url: issue.url.clone(),
                },
                now,
            );
        }
        debug!(issue = issue.number, points, "split red team bounty");
        Ok(points)
    }

    async fn identify(&self, pseudonym: &str) -> User {
        match self.identities.resolve(self.resolver, pseudonym).await {
            Ok(user) => user,
            Err(e) => {
                warn!(pseudonym, error = %e, "could not resolve bounty hunter; using pseudonym");
                User::named(pseudonym)
            }
        }
    }
}

//! Blue team: rewards attributed by time worked, driven by real
//! assignment events.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::curve::RewardCurve;
use crate::domain::{EnrichedIssue, IssueError};
use crate::ledger::{ContributorLedger, IssueScore, Leaderboard, SkippedIssue};
use crate::obs;
use crate::timeline::{EventTimeline, TimelineInput};

/// Blue-team scoring anchored at a fixed `now`.
pub struct BlueTeam<'a> {
    curve: &'a RewardCurve,
    now: DateTime<Utc>,
}

impl<'a> BlueTeam<'a> {
    pub fn new(curve: &'a RewardCurve, now: DateTime<Utc>) -> Self {
        Self { curve, now }
    }

    /// Score one issue in isolation.
    pub fn score_issue(&self, enriched: &EnrichedIssue) -> Result<IssueScore, IssueError> {
        let mut ledger = ContributorLedger::new(self.now);
        let timeline = EventTimeline::build(
            &TimelineInput::for_issue(&enriched.issue, &enriched.events),
            self.now,
        );
        let mapped = ledger.map_issue(&enriched.issue, &timeline)?;
        Ok(ledger.update_rewards(&mapped, self.curve))
    }

    /// Aggregate every closed issue into a leaderboard.
    ///
    /// Open issues and pull requests are not scoreable yet and are passed
    /// over; any other per-issue failure is logged and the issue is listed
    /// in [`Leaderboard::skipped`].
    pub fn aggregate(&self, issues: &[EnrichedIssue], currency: &str) -> Leaderboard {
        let mut ledger = ContributorLedger::new(self.now);
        let mut board = Leaderboard::empty(currency, self.now);

        for enriched in issues {
            let issue = &enriched.issue;
            if issue.is_pull_request || !issue.is_closed() {
                debug!(issue = issue.number, "not scoreable yet");
                continue;
            }
            let timeline =
                EventTimeline::build(&TimelineInput::for_issue(issue, &enriched.events), self.now);
            match ledger.map_issue(issue, &timeline) {
                Ok(mapped) => {
                    let score = ledger.update_rewards(&mapped, self.curve);
                    obs::emit_issue_scored(issue.number, score.total, score.shares.len());
                    board.record_scored(&issue.url);
                    board.total_rewards += score.total;
                }
                Err(e) => {
                    warn!(issue = issue.number, error = %e, "excluding issue from blue team");
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
}

//! Contributor ledger: per-issue mapping, reward distribution and
//! cross-issue aggregation.
//!
//! - [`ContributorLedger`] accumulates [`Contributor`] records for one request.
//! - [`blue::BlueTeam`] attributes curve rewards by time worked.
//! - [`red::RedTeam`] splits fixed bounties of migrated issues.
//! - [`Leaderboard`] is the ranked, serialisable result.

pub mod blue;
pub mod red;
pub mod stats;

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::curve::RewardCurve;
use crate::domain::{Contributor, Issue, IssueError, RewardEvent, Severity, User, WorkLogs};
use crate::timeline::TimelineOutcome;

pub use blue::BlueTeam;
pub use red::RedTeam;
pub use stats::{update_average_severity, update_mean_and_deviation_of_disclosure};

/// A validated, closed issue ready for reward distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedIssue {
    pub number: u64,
    pub url: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub reopen_count: u32,
    pub work_logs: WorkLogs,
    pub disclosure_minutes: i64,
}

/// One contributor's cut of an issue's reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardShare {
    pub login: String,
    /// Summed duration of the contributor's work logs, in seconds.
    pub worked_seconds: i64,
    pub amount: f64,
}

/// Reward computed for a single issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueScore {
    pub number: u64,
    pub url: String,
    pub severity: Severity,
    pub reopen_count: u32,
    pub total: f64,
    pub shares: Vec<RewardShare>,
}

/// Issue left out of a leaderboard and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedIssue {
    pub number: u64,
    pub url: String,
    pub reason: String,
}

/// Repository whose pass was aborted by a tracker error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryFailure {
    pub repository: String,
    pub error: String,
}

/// Ranked contributors plus board-level statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub generated_at: DateTime<Utc>,
    pub currency: String,
    pub contributors: Vec<Contributor>,
    /// Distinct issues that paid out, on either team.
    pub issues_scored: usize,
    /// Curve rewards paid to the blue team, in `currency`.
    pub total_rewards: f64,
    /// Fixed bounty points credited to the red team.
    #[serde(default)]
    pub bounty_points: f64,
    /// URLs of the scored issues.
    #[serde(default)]
    pub scored_issues: BTreeSet<String>,
    #[serde(default)]
    pub skipped: Vec<SkippedIssue>,
    #[serde(default)]
    pub failed_repositories: Vec<RepositoryFailure>,
}

impl Leaderboard {
    pub fn empty(currency: &str, now: DateTime<Utc>) -> Self {
        Self {
            generated_at: now,
            currency: currency.to_string(),
            contributors: Vec::new(),
            issues_scored: 0,
            total_rewards: 0.0,
            bounty_points: 0.0,
            scored_issues: BTreeSet::new(),
            skipped: Vec::new(),
            failed_repositories: Vec::new(),
        }
    }

    /// Count `url` as scored. An issue paid by both teams counts once.
    pub fn record_scored(&mut self, url: &str) {
        self.scored_issues.insert(url.to_string());
        self.issues_scored = self.scored_issues.len();
    }

    /// Combine boards (several repositories, or blue and red teams) into one.
    /// Contributors with the same login are folded together and re-ranked.
    ///
    /// Issues are identified by URL: one scored by both teams counts once,
    /// and a skip reported by one team is dropped when the other scored it.
    pub fn merge(boards: Vec<Leaderboard>, currency: &str, now: DateTime<Utc>) -> Leaderboard {
        let mut merged = Leaderboard::empty(currency, now);
        let mut by_login: HashMap<String, Contributor> = HashMap::new();
        let mut skipped = Vec::new();
        for board in boards {
            merged.scored_issues.extend(board.scored_issues);
            merged.total_rewards += board.total_rewards;
            merged.bounty_points += board.bounty_points;
            skipped.extend(board.skipped);
            merged.failed_repositories.extend(board.failed_repositories);
            for contributor in board.contributors {
                match by_login.get_mut(&contributor.login) {
                    Some(existing) => existing.absorb(contributor),
                    None => {
                        by_login.insert(contributor.login.clone(), contributor);
                    }
                }
            }
        }
        merged.issues_scored = merged.scored_issues.len();

        let mut seen = HashSet::new();
        merged.skipped = skipped
            .into_iter()
            .filter(|s| !merged.scored_issues.contains(&s.url) && seen.insert(s.url.clone()))
            .collect();
        merged.contributors = finalize(by_login.into_values().collect());
        merged
    }

    pub fn contributor(&self, login: &str) -> Option<&Contributor> {
        self.contributors.iter().find(|c| c.login == login)
    }
}

/// Order by descending reward, then ascending case-insensitive login.
pub fn sort_contributors(contributors: &mut [Contributor]) {
    contributors.sort_by(|a, b| {
        b.reward_sum
            .total_cmp(&a.reward_sum)
            .then_with(|| a.login.to_lowercase().cmp(&b.login.to_lowercase()))
            .then_with(|| a.login.cmp(&b.login))
    });
}

/// Run the statistics post-pass and rank.
fn finalize(mut contributors: Vec<Contributor>) -> Vec<Contributor> {
    update_mean_and_deviation_of_disclosure(&mut contributors);
    update_average_severity(&mut contributors);
    sort_contributors(&mut contributors);
    contributors
}

/// Accumulates contributor records for one computation.
#[derive(Debug)]
pub struct ContributorLedger {
    contributors: HashMap<String, Contributor>,
    now: DateTime<Utc>,
}

impl ContributorLedger {
    /// `now` anchors the rolling month window.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            contributors: HashMap::new(),
            now,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }

    /// Record for `user`, created on first use.
    pub fn contributor_mut(&mut self, user: &User) -> &mut Contributor {
        self.contributors
            .entry(user.login.clone())
            .or_insert_with(|| Contributor::new(user))
    }

    /// Validate `issue` and count one fix for each participant.
    ///
    /// Nothing is recorded when validation fails.
    pub fn map_issue(
        &mut self,
        issue: &Issue,
        timeline: &TimelineOutcome,
    ) -> Result<MappedIssue, IssueError> {
        let closed_at = issue.closed_at.ok_or(IssueError::IssueMissingClosedAt {
            number: issue.number,
        })?;
        let severity = issue.severity()?;
        if timeline.participants.is_empty() {
            if timeline.only_late_assignments() {
                return Err(IssueError::InsufficientData {
                    number: issue.number,
                    detail: "every assignment was recorded after the issue was closed".to_string(),
                });
            }
            return Err(IssueError::NoContributors {
                number: issue.number,
            });
        }

        let disclosure_minutes = (closed_at - issue.created_at).num_minutes();
        for participant in &timeline.participants {
            self.contributor_mut(participant)
                .record_fix(Some(severity), Some(disclosure_minutes));
        }

        Ok(MappedIssue {
            number: issue.number,
            url: issue.url.clone(),
            severity,
            created_at: issue.created_at,
            closed_at,
            reopen_count: timeline.reopen_count,
            work_logs: timeline.work_logs.clone(),
            disclosure_minutes,
        })
    }

    /// Distribute the curve reward of `mapped` in proportion to time worked.
    ///
    /// When nobody logged any time the reward is split equally.
    pub fn update_rewards(&mut self, mapped: &MappedIssue, curve: &RewardCurve) -> IssueScore {
        let total = curve.reward(
            mapped.closed_at - mapped.created_at,
            mapped.reopen_count,
            mapped.severity,
        );
        let total_seconds = mapped.work_logs.total_worked().num_seconds();
        let headcount = mapped.work_logs.len() as f64;

        let mut shares = Vec::with_capacity(mapped.work_logs.len());
        for login in mapped.work_logs.logins() {
            let worked_seconds = mapped.work_logs.worked(login).num_seconds();
            let amount = if total_seconds <= 0 {
                total / headcount
            } else {
                total * worked_seconds as f64 / total_seconds as f64
            };
            let event = RewardEvent {
                date: mapped.closed_at,
                amount,
                issue_url: mapped.url.clone(),
            };
            let now = self.now;
            self.contributor_mut(&User::named(login))
                .add_reward(event, now);
            shares.push(RewardShare {
                login: login.to_string(),
                worked_seconds,
                amount,
            });
        }

        debug!(
            issue = mapped.number,
            total,
            contributors = shares.len(),
            "distributed issue reward"
        );

        IssueScore {
            number: mapped.number,
            url: mapped.url.clone(),
            severity: mapped.severity,
            reopen_count: mapped.reopen_count,
            total,
            shares,
        }
    }

    /// Finish the computation: statistics post-pass, then ranking.
    pub fn into_ranked(self) -> Vec<Contributor> {
        finalize(self.contributors.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewardConfig;
    use crate::domain::WorkLog;
    use chrono::{Duration, TimeZone};

    fn t(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    fn issue(labels: &[&str], closed: Option<i64>) -> Issue {
        Issue {
            id: 100,
            number: 5,
            url: "https://github.com/acme/web/issues/5".to_string(),
            title: "CSRF on settings".to_string(),
            created_at: t(0),
            closed_at: closed.map(t),
            assignees: vec![],
            labels: labels.iter().map(|s| s.to_string()).collect(),
            migrated: false,
            bounty_points: None,
            red_team: vec![],
            is_pull_request: false,
        }
    }

    fn timeline(logs: &[(&str, i64, i64)]) -> TimelineOutcome {
        let mut outcome = TimelineOutcome::default();
        for (login, start, end) in logs {
            outcome.work_logs.push(login, WorkLog::new(t(*start), t(*end)));
            if !outcome.participants.iter().any(|p| p.login == *login) {
                outcome.participants.push(User::named(*login));
            }
        }
        outcome
    }

    fn contributor(name: &str, reward: f64) -> Contributor {
        let mut c = Contributor::new(&User::named(name));
        c.reward_sum = reward;
        c
    }

    #[test]
    fn test_map_issue_requires_closed_at() {
        let mut ledger = ContributorLedger::new(t(48));
        let err = ledger
            .map_issue(&issue(&["low"], None), &timeline(&[("alice", 0, 1)]))
            .unwrap_err();
        assert_eq!(err, IssueError::IssueMissingClosedAt { number: 5 });
        assert!(ledger.is_empty(), "nothing recorded on failure");
    }

    #[test]
    fn test_map_issue_requires_single_severity() {
        let mut ledger = ContributorLedger::new(t(48));
        let err = ledger
            .map_issue(&issue(&[], Some(24)), &timeline(&[("alice", 0, 1)]))
            .unwrap_err();
        assert_eq!(err, IssueError::IssueMissingSeverityLabel { number: 5 });

        let err = ledger
            .map_issue(&issue(&["low", "critical"], Some(24)), &timeline(&[("alice", 0, 1)]))
            .unwrap_err();
        assert!(matches!(err, IssueError::IssueMultipleSeverityLabels { .. }));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_map_issue_without_participants() {
        let mut ledger = ContributorLedger::new(t(48));
        let err = ledger
            .map_issue(&issue(&["low"], Some(24)), &timeline(&[]))
            .unwrap_err();
        assert_eq!(err, IssueError::NoContributors { number: 5 });
    }

    #[test]
    fn test_full_attribution_to_single_contributor() {
        let curve = RewardCurve::new(&RewardConfig::default());
        let mut ledger = ContributorLedger::new(t(48));
        let mapped = ledger
            .map_issue(&issue(&["low"], Some(24)), &timeline(&[("alice", 0, 24)]))
            .unwrap();
        assert_eq!(mapped.disclosure_minutes, 24 * 60);
        let score = ledger.update_rewards(&mapped, &curve);
        assert!((score.total - 975.0).abs() < 1e-6);
        assert_eq!(score.shares.len(), 1);
        assert!((score.shares[0].amount - 975.0).abs() < 1e-6);

        let ranked = ledger.into_ranked();
        assert_eq!(ranked[0].fix_count, 1);
        assert_eq!(ranked[0].severity.low, 1);
        assert_eq!(ranked[0].mean_severity, 2.0);
        assert_eq!(ranked[0].month_rewards[0], ranked[0].reward_sum);
    }

    #[test]
    fn test_equal_work_splits_evenly() {
        let curve = RewardCurve::new(&RewardConfig::default());
        let mut ledger = ContributorLedger::new(t(48));
        let mapped = ledger
            .map_issue(
                &issue(&["high"], Some(24)),
                &timeline(&[("alice", 0, 6), ("bob", 10, 16)]),
            )
            .unwrap();
        let score = ledger.update_rewards(&mapped, &curve);
        assert_eq!(score.shares[0].amount, score.shares[1].amount);
        assert!((score.shares[0].amount * 2.0 - score.total).abs() < 1e-9);
    }

    #[test]
    fn test_proportional_split() {
        let curve = RewardCurve::new(&RewardConfig::default());
        let mut ledger = ContributorLedger::new(t(48));
        let mapped = ledger
            .map_issue(
                &issue(&["medium"], Some(24)),
                &timeline(&[("alice", 0, 18), ("bob", 18, 24)]),
            )
            .unwrap();
        let score = ledger.update_rewards(&mapped, &curve);
        let alice = score.shares.iter().find(|s| s.login == "alice").unwrap();
        let bob = score.shares.iter().find(|s| s.login == "bob").unwrap();
        assert!((alice.amount - score.total * 0.75).abs() < 1e-9);
        assert!((bob.amount - score.total * 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_splits_equally() {
        let curve = RewardCurve::new(&RewardConfig::default());
        let mut ledger = ContributorLedger::new(t(48));
        let mapped = ledger
            .map_issue(
                &issue(&["critical"], Some(24)),
                &timeline(&[("alice", 24, 24), ("bob", 24, 24), ("carol", 24, 24)]),
            )
            .unwrap();
        let score = ledger.update_rewards(&mapped, &curve);
        for share in &score.shares {
            assert!(share.amount.is_finite());
            assert!((share.amount - score.total / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_sort_by_reward_then_case_insensitive_login() {
        let mut all = vec![
            contributor("bob", 10.0),
            contributor("Carol", 50.0),
            contributor("alice", 10.0),
            contributor("Bea", 10.0),
        ];
        sort_contributors(&mut all);
        let logins: Vec<_> = all.iter().map(|c| c.login.as_str()).collect();
        assert_eq!(logins, vec!["Carol", "alice", "Bea", "bob"]);
    }

    #[test]
    fn test_merge_folds_same_login() {
        let now = t(48);
        let mut a = Leaderboard::empty("USD", now);
        a.contributors = vec![contributor("alice", 5.0)];
        a.record_scored("https://github.com/acme/web/issues/1");
        a.total_rewards = 5.0;
        let mut b = Leaderboard::empty("USD", now);
        b.contributors = vec![contributor("alice", 7.0), contributor("zed", 20.0)];
        b.record_scored("https://github.com/acme/api/issues/1");
        b.record_scored("https://github.com/acme/api/issues/2");
        b.total_rewards = 27.0;

        let merged = Leaderboard::merge(vec![a, b], "USD", now);
        assert_eq!(merged.issues_scored, 3);
        assert_eq!(merged.total_rewards, 32.0);
        assert_eq!(merged.contributors.len(), 2);
        assert_eq!(merged.contributors[0].login, "zed");
        assert_eq!(merged.contributor("alice").unwrap().reward_sum, 12.0);
    }

    #[test]
    fn test_merge_counts_an_issue_scored_by_both_teams_once() {
        let now = t(48);
        let url = "https://github.com/acme/legacy/issues/9";
        let mut blue = Leaderboard::empty("USD", now);
        blue.record_scored(url);
        blue.total_rewards = 4625.0;
        blue.skipped.push(SkippedIssue {
            number: 10,
            url: "https://github.com/acme/legacy/issues/10".into(),
            reason: "issue #10 has no contributors".into(),
        });
        let mut red = Leaderboard::empty("USD", now);
        red.record_scored(url);
        red.record_scored("https://github.com/acme/legacy/issues/10");
        red.bounty_points = 300.0;
        red.skipped.push(SkippedIssue {
            number: 11,
            url: "https://github.com/acme/legacy/issues/11".into(),
            reason: "missing red_team".into(),
        });

        let merged = Leaderboard::merge(vec![blue, red], "USD", now);
        assert_eq!(merged.issues_scored, 2);
        assert_eq!(merged.total_rewards, 4625.0);
        assert_eq!(merged.bounty_points, 300.0);
        let skipped: Vec<u64> = merged.skipped.iter().map(|s| s.number).collect();
        assert_eq!(skipped, vec![11]);
    }
}

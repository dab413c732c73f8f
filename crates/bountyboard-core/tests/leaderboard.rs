//! Leaderboards through the service entry points.

use std::sync::Arc;

use bountyboard_core::domain::{EventAction, Issue, IssueEvent, RepoRef, User};
use bountyboard_core::fakes::MemoryTracker;
use bountyboard_core::{BountyConfig, BountyError, BountyService, Leaderboard};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn t(hour: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

fn repo(name: &str) -> RepoRef {
    RepoRef::new("acme", name)
}

fn issue(number: u64, label: &str, closed_hour: i64, assignees: &[&str]) -> Issue {
    Issue {
        id: number,
        number,
        url: format!("https://github.com/acme/web/issues/{number}"),
        title: format!("finding {number}"),
        created_at: t(0),
        closed_at: Some(t(closed_hour)),
        assignees: assignees.iter().map(|l| User::named(*l)).collect(),
        labels: vec![label.to_string()],
        migrated: false,
        bounty_points: None,
        red_team: vec![],
        is_pull_request: false,
    }
}

fn event(id: u64, action: EventAction, login: Option<&str>, hour: i64) -> IssueEvent {
    IssueEvent {
        id,
        action,
        assignee: login.map(User::named),
        created_at: t(hour),
    }
}

fn service(tracker: &Arc<MemoryTracker>) -> BountyService {
    BountyService::new(tracker.clone(), tracker.clone(), BountyConfig::default()).at(now())
}

fn assert_rewards_consistent(board: &Leaderboard) {
    for c in &board.contributors {
        let events: f64 = c.rewards.iter().map(|r| r.amount).sum();
        assert!((c.reward_sum - events).abs() < 1e-9, "{}", c.login);
    }
    for pair in board.contributors.windows(2) {
        assert!(pair[0].reward_sum >= pair[1].reward_sum);
        if pair[0].reward_sum == pair[1].reward_sum {
            assert!(pair[0].login.to_lowercase() <= pair[1].login.to_lowercase());
        }
    }
}

#[tokio::test]
async fn test_equal_work_splits_reward_in_half() {
    let tracker = Arc::new(MemoryTracker::new());
    tracker.add_issue(&repo("web"), issue(1, "low", 24, &["alice", "bob"]));
    tracker.set_events(
        &repo("web"),
        1,
        vec![
            event(1, EventAction::Assigned, Some("alice"), 0),
            event(2, EventAction::Assigned, Some("bob"), 0),
        ],
    );

    let board = service(&tracker).list_blue_team(&[repo("web")]).await.unwrap();
    assert_eq!(board.issues_scored, 1);
    assert_eq!(board.total_rewards, 975.0);
    assert_eq!(board.contributor("alice").unwrap().reward_sum, 487.5);
    assert_eq!(board.contributor("bob").unwrap().reward_sum, 487.5);
    // Equal rewards fall back to login order.
    assert_eq!(board.contributors[0].login, "alice");
    assert_rewards_consistent(&board);
}

#[tokio::test]
async fn test_reopen_raises_the_exponent() {
    let tracker = Arc::new(MemoryTracker::new());
    tracker.add_issue(&repo("web"), issue(1, "low", 24, &["alice"]));
    tracker.set_events(
        &repo("web"),
        1,
        vec![
            event(1, EventAction::Assigned, Some("alice"), 0),
            event(2, EventAction::Closed, None, 12),
            event(3, EventAction::Reopened, None, 13),
        ],
    );

    let board = service(&tracker).list_blue_team(&[repo("web")]).await.unwrap();
    let alice = board.contributor("alice").unwrap();
    assert!((alice.reward_sum - 926.859375).abs() < 1e-9);
    assert_eq!(alice.month_rewards[1], alice.reward_sum);
}

#[tokio::test]
async fn test_skipped_issues_are_reported() {
    let tracker = Arc::new(MemoryTracker::new());
    tracker.add_issue(&repo("web"), issue(1, "medium", 48, &["carol"]));
    tracker.set_events(&repo("web"), 1, vec![event(1, EventAction::Assigned, Some("carol"), 0)]);
    tracker.add_issue(&repo("web"), issue(2, "none", 48, &["dave"]));
    tracker.add_issue(&repo("web"), issue(3, "high", 48, &["erin"]));
    tracker.fail_events(&repo("web"), 3);

    let board = service(&tracker).list_blue_team(&[repo("web")]).await.unwrap();
    assert_eq!(board.issues_scored, 1);
    let skipped: Vec<u64> = board.skipped.iter().map(|s| s.number).collect();
    assert!(skipped.contains(&2));
    assert!(skipped.contains(&3));
    assert!(board.contributor("dave").is_none());
    assert_rewards_consistent(&board);
}

#[tokio::test]
async fn test_contributors_merge_blue_and_red() {
    let tracker = Arc::new(MemoryTracker::new());
    tracker.add_issue(&repo("web"), issue(1, "low", 24, &["kate"]));
    tracker.set_events(&repo("web"), 1, vec![event(1, EventAction::Assigned, Some("kate"), 0)]);

    let mut legacy = issue(2, "high", 72, &[]);
    legacy.migrated = true;
    legacy.bounty_points = Some(300.0);
    legacy.red_team = vec!["acid_burn".into(), "zerocool".into()];
    tracker.add_issue(&repo("web"), legacy);
    tracker.add_identity("acid_burn", User::named("kate"));

    let svc = service(&tracker);
    let red = svc.list_red_team(&[repo("web")]).await.unwrap();
    assert_eq!(red.bounty_points, 300.0);
    assert_eq!(red.total_rewards, 0.0);
    assert_eq!(red.contributor("kate").unwrap().reward_sum, 150.0);
    assert_eq!(red.contributor("zerocool").unwrap().reward_sum, 150.0);
    assert_eq!(svc.identities().len(), 1);

    let all = svc.list_contributors(&[repo("web")]).await.unwrap();
    let kate = all.contributor("kate").unwrap();
    assert_eq!(kate.reward_sum, 975.0 + 150.0);
    assert_eq!(kate.fix_count, 2);
    assert_eq!(all.contributors[0].login, "kate");
    // The blue team cannot score #2 (no assignees) but the red team did.
    assert_eq!(all.issues_scored, 2);
    assert!(all.skipped.is_empty());
    assert_rewards_consistent(&all);
}

#[tokio::test]
async fn test_migrated_issue_paid_by_both_teams_counts_once() {
    let tracker = Arc::new(MemoryTracker::new());
    let mut legacy = issue(9, "high", 72, &["fixer"]);
    legacy.migrated = true;
    legacy.bounty_points = Some(300.0);
    legacy.red_team = vec!["hunter".into()];
    tracker.add_issue(&repo("web"), legacy);

    let all = service(&tracker).list_contributors(&[repo("web")]).await.unwrap();
    assert_eq!(all.issues_scored, 1);
    assert!((all.total_rewards - 4625.0).abs() < 1e-6);
    assert_eq!(all.bounty_points, 300.0);
    assert!(all.skipped.is_empty());
    assert!((all.contributor("fixer").unwrap().reward_sum - 4625.0).abs() < 1e-6);
    assert_eq!(all.contributor("hunter").unwrap().reward_sum, 300.0);
    assert_rewards_consistent(&all);
}

#[tokio::test]
async fn test_failing_repository_does_not_sink_the_others() {
    let tracker = Arc::new(MemoryTracker::new());
    tracker.add_issue(&repo("web"), issue(1, "low", 24, &["alice"]));
    tracker.set_events(&repo("web"), 1, vec![event(1, EventAction::Assigned, Some("alice"), 0)]);
    tracker.add_issue(&repo("api"), issue(1, "low", 24, &["bob"]));
    tracker.fail_repository(&repo("api"));

    let svc = service(&tracker);
    let board = svc.list_blue_team(&[repo("web"), repo("api")]).await.unwrap();
    assert_eq!(board.failed_repositories.len(), 1);
    assert_eq!(board.failed_repositories[0].repository, "acme/api");
    assert!(board.contributor("alice").is_some());

    let err = svc.list_blue_team(&[repo("api")]).await.unwrap_err();
    assert!(matches!(err, BountyError::Tracker(_)));
}

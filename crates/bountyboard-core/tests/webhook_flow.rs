//! Webhook deliveries end to end, including concurrent re-entry on one issue.

use std::sync::Arc;

use bountyboard_core::domain::{EventAction, Issue, IssueEvent, RepoRef, User};
use bountyboard_core::fakes::MemoryTracker;
use bountyboard_core::webhook::IgnoreReason;
use bountyboard_core::{BountyConfig, BountyError, BountyService, WebhookEvent, WebhookOutcome};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

fn t(hour: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
}

fn repo() -> RepoRef {
    RepoRef::new("acme", "web")
}

fn seeded(config: BountyConfig) -> (Arc<MemoryTracker>, BountyService) {
    let tracker = Arc::new(MemoryTracker::new());
    tracker.add_issue(
        &repo(),
        Issue {
            id: 700,
            number: 7,
            url: "https://github.com/acme/web/issues/7".into(),
            title: "SSRF in importer".into(),
            created_at: t(0),
            closed_at: Some(t(48)),
            assignees: vec![User::named("alice")],
            labels: vec!["high".into()],
            migrated: false,
            bounty_points: None,
            red_team: vec![],
            is_pull_request: false,
        },
    );
    tracker.set_events(
        &repo(),
        7,
        vec![IssueEvent {
            id: 1,
            action: EventAction::Assigned,
            assignee: Some(User::named("alice")),
            created_at: t(1),
        }],
    );
    let service = BountyService::new(tracker.clone(), tracker.clone(), config).at(t(24 * 40));
    (tracker, service)
}

fn delivery(action: &str, sender: &str) -> WebhookEvent {
    serde_json::from_value(json!({
        "action": action,
        "issue": { "number": 7 },
        "repository": { "full_name": "acme/web" },
        "sender": { "login": sender }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_closed_delivery_reconciles_issue() {
    let (tracker, service) = seeded(BountyConfig::default());

    let outcome = service
        .receive_webhook_event(&delivery("closed", "alice"))
        .await
        .unwrap();
    let report = match outcome {
        WebhookOutcome::Reconciled(report) => report,
        other => panic!("expected reconciliation, got {other:?}"),
    };
    assert_eq!(report.number, 7);
    assert_eq!(report.created(), 2);
    assert!(tracker.comments(&repo(), 7)[1].body.contains("@alice"));
}

#[tokio::test]
async fn test_bot_comment_delivery_is_ignored() {
    let (tracker, service) = seeded(BountyConfig::default());
    let event: WebhookEvent = serde_json::from_value(json!({
        "action": "created",
        "issue": { "number": 7 },
        "comment": { "id": 99, "user": { "login": "bountyboard[bot]" } },
        "repository": { "full_name": "acme/web" },
        "sender": { "login": "bountyboard[bot]" }
    }))
    .unwrap();

    let outcome = service.receive_webhook_event(&event).await.unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Ignored {
            reason: IgnoreReason::BotComment
        }
    );
    assert!(tracker.writes().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deliveries_leave_one_comment_per_kind() {
    let (tracker, service) = seeded(BountyConfig::default());

    let mut handles = Vec::new();
    for action in ["assigned", "labeled", "closed", "edited", "unlabeled", "reopened"] {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .receive_webhook_event(&delivery(action, "alice"))
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            WebhookOutcome::Reconciled(report) => created += report.created(),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(created, 2);
    assert_eq!(tracker.comments(&repo(), 7).len(), 2);
    assert!(!service.admission().is_held(&repo().issue_key(7)));
}

#[tokio::test(start_paused = true)]
async fn test_admission_timeout_surfaces_as_error() {
    let mut config = BountyConfig::default();
    config.runtime.admission_timeout_secs = Some(2);
    let (tracker, service) = seeded(config);

    let key = repo().issue_key(7);
    let holder = service.admission().wait(&key).await.unwrap();

    let err = service
        .receive_webhook_event(&delivery("closed", "alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, BountyError::AdmissionTimeout { .. }));
    assert!(tracker.writes().is_empty());

    drop(holder);
    assert!(service
        .receive_webhook_event(&delivery("closed", "alice"))
        .await
        .is_ok());
}

//! Event replay: an issue's lifecycle events → per-contributor work logs.
//!
//! Replay never fails. Inconsistencies in the event log (an assignment with
//! no assignee, an unassignment with nothing open) are recorded as
//! [`TimelineWarning`]s, logged, and skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{EventAction, Issue, IssueEvent, User, WorkLog, WorkLogs};

/// Non-fatal problem found while replaying events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineWarning {
    #[error("event {event_id} ({action}) carries no assignee")]
    MissingAssignee { event_id: u64, action: EventAction },

    #[error("{login} was assigned at {at} after the issue was closed")]
    AssignedAfterClose { login: String, at: DateTime<Utc> },

    #[error("{login} was unassigned at {at} without an open work log")]
    NoWorkLogForAssignee { login: String, at: DateTime<Utc> },
}

/// What the timeline needs to know about one issue.
#[derive(Debug, Clone, Copy)]
pub struct TimelineInput<'a> {
    pub number: u64,
    pub events: &'a [IssueEvent],
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub assignees: &'a [User],
    pub migrated: bool,
}

impl<'a> TimelineInput<'a> {
    pub fn for_issue(issue: &'a Issue, events: &'a [IssueEvent]) -> Self {
        Self {
            number: issue.number,
            events,
            created_at: issue.created_at,
            closed_at: issue.closed_at,
            assignees: &issue.assignees,
            migrated: issue.migrated,
        }
    }
}

/// Result of replaying one issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineOutcome {
    pub work_logs: WorkLogs,
    pub reopen_count: u32,
    /// Contributors credited on the issue, in the order first seen.
    pub participants: Vec<User>,
    pub warnings: Vec<TimelineWarning>,
}

impl TimelineOutcome {
    /// `true` when assignments existed but all of them were ignored
    /// because they were recorded after closure.
    pub fn only_late_assignments(&self) -> bool {
        self.participants.is_empty()
            && self
                .warnings
                .iter()
                .any(|w| matches!(w, TimelineWarning::AssignedAfterClose { .. }))
    }
}

/// Builds [`TimelineOutcome`]s.
pub struct EventTimeline;

impl EventTimeline {
    /// Replay `input`. Open intervals run to `closed_at`, or to `now` while
    /// the issue is still open.
    pub fn build(input: &TimelineInput<'_>, now: DateTime<Utc>) -> TimelineOutcome {
        if input.migrated {
            return Self::synthesize(input, now);
        }

        let horizon = input.closed_at.unwrap_or(now);
        let mut replay = Replay::default();

        for event in input.events {
            match event.action {
                EventAction::Assigned => {
                    let Some(assignee) = &event.assignee else {
                        replay.warn(input.number, TimelineWarning::MissingAssignee {
                            event_id: event.id,
                            action: event.action,
                        });
                        continue;
                    };
                    if input.closed_at.is_some_and(|closed| event.created_at > closed) {
                        replay.warn(input.number, TimelineWarning::AssignedAfterClose {
                            login: assignee.login.clone(),
                            at: event.created_at,
                        });
                        continue;
                    }
                    replay.open(assignee, event.created_at, horizon);
                }
                EventAction::Unassigned => {
                    let Some(assignee) = &event.assignee else {
                        replay.warn(input.number, TimelineWarning::MissingAssignee {
                            event_id: event.id,
                            action: event.action,
                        });
                        continue;
                    };
                    let end = event.created_at.min(horizon);
                    if !replay.close(&assignee.login, end) {
                        replay.warn(input.number, TimelineWarning::NoWorkLogForAssignee {
                            login: assignee.login.clone(),
                            at: event.created_at,
                        });
                    }
                }
                EventAction::Reopened => replay.outcome.reopen_count += 1,
                EventAction::Closed
                | EventAction::Labeled
                | EventAction::Unlabeled
                | EventAction::Other => {}
            }
        }

        debug!(
            issue = input.number,
            contributors = replay.outcome.work_logs.len(),
            reopens = replay.outcome.reopen_count,
            "replayed issue timeline"
        );
        replay.outcome
    }

    /// Legacy issues have no event log: every assignee is credited for the
    /// whole open period.
    fn synthesize(input: &TimelineInput<'_>, now: DateTime<Utc>) -> TimelineOutcome {
        let end = input.closed_at.unwrap_or(now);
        let mut outcome = TimelineOutcome::default();
        for assignee in input.assignees {
            outcome
                .work_logs
                .push(&assignee.login, WorkLog::new(input.created_at, end));
            if !outcome.participants.iter().any(|p| p.login == assignee.login) {
                outcome.participants.push(assignee.clone());
            }
        }
        outcome
    }
}

#[derive(Default)]
struct Replay {
    outcome: TimelineOutcome,
    /// Open flags parallel to each contributor's intervals.
    open: std::collections::HashMap<String, Vec<bool>>,
}

impl Replay {
    fn open(&mut self, assignee: &User, start: DateTime<Utc>, horizon: DateTime<Utc>) {
        self.outcome
            .work_logs
            .push(&assignee.login, WorkLog::new(start, horizon));
        self.open
            .entry(assignee.login.clone())
            .or_default()
            .push(true);
        if !self
            .outcome
            .participants
            .iter()
            .any(|p| p.login == assignee.login)
        {
            self.outcome.participants.push(assignee.clone());
        }
    }

    /// Close the most recently opened interval that is still open.
    fn close(&mut self, login: &str, end: DateTime<Utc>) -> bool {
        let Some(flags) = self.open.get_mut(login) else {
            return false;
        };
        let Some(idx) = flags.iter().rposition(|open| *open) else {
            return false;
        };
        flags[idx] = false;
        if let Some(log) = self
            .outcome
            .work_logs
            .get_mut(login)
            .and_then(|logs| logs.get_mut(idx))
        {
            log.end = end;
        }
        true
    }

    fn warn(&mut self, number: u64, warning: TimelineWarning) {
        warn!(issue = number, warning = %warning, "skipping event");
        self.outcome.warnings.push(warning);
    }
}

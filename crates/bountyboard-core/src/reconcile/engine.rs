//! Converging an issue's comments to the desired state.

use std::sync::Arc;

use futures::future::join;
use tracing::debug;

use crate::domain::{Comment, CommentKind, RepoRef};
use crate::obs;
use crate::reconcile::desired::DesiredComments;
use crate::reconcile::marker::CommentMatcher;
use crate::reconcile::outcome::{CommentAction, IssueReconciliation, KindOutcome, UpdateReason};
use crate::tracker::IssueTracker;

/// Issues the minimal set of comment writes for one issue.
///
/// Runs three passes: duplicates are deleted, each kind is updated or
/// created (both kinds concurrently), and finally the pair is reordered so
/// the Eligible comment comes first. A write failure is recorded against
/// its kind and never stops the other kind.
pub struct CommentReconciler {
    tracker: Arc<dyn IssueTracker>,
    matcher: CommentMatcher,
}

/// Surviving managed comment of each kind after deduplication.
#[derive(Debug, Default)]
struct Slots {
    eligible: Option<Comment>,
    reward: Option<Comment>,
}

struct Converged {
    current: Option<Comment>,
    outcome: KindOutcome,
}

impl CommentReconciler {
    pub fn new(tracker: Arc<dyn IssueTracker>, matcher: CommentMatcher) -> Self {
        Self { tracker, matcher }
    }

    pub fn matcher(&self) -> &CommentMatcher {
        &self.matcher
    }

    /// Reconcile `existing` (the issue's current comments, any author)
    /// against `desired`.
    pub async fn reconcile(
        &self,
        repo: &RepoRef,
        number: u64,
        existing: Vec<Comment>,
        desired: &DesiredComments,
    ) -> IssueReconciliation {
        let repo_name = repo.to_string();
        let mut report = IssueReconciliation::new(&repo_name, number);

        let slots = self.dedup(repo, number, existing, &mut report).await;

        let (eligible, reward) = join(
            self.converge(repo, number, CommentKind::Eligible, slots.eligible, desired),
            self.converge(repo, number, CommentKind::Reward, slots.reward, desired),
        )
        .await;
        absorb(&mut report.eligible, eligible.outcome);
        absorb(&mut report.reward, reward.outcome);

        if let (Some(eligible), Some(reward)) = (eligible.current, reward.current) {
            if report.eligible.is_ok() && report.reward.is_ok() {
                self.order(repo, number, &eligible, &reward, desired, &mut report)
                    .await;
            }
        }

        obs::emit_reconciled(&repo_name, number, report.action_count(), report.error_count());
        report
    }

    /// Keep the earliest managed comment of each kind, delete the rest.
    async fn dedup(
        &self,
        repo: &RepoRef,
        number: u64,
        mut existing: Vec<Comment>,
        report: &mut IssueReconciliation,
    ) -> Slots {
        existing.sort_by_key(Comment::position);
        let repo_name = repo.to_string();
        let mut slots = Slots::default();

        for comment in existing {
            let Some(managed) = self.matcher.classify(&comment) else {
                continue;
            };
            let slot = match managed.kind {
                CommentKind::Eligible => &mut slots.eligible,
                CommentKind::Reward => &mut slots.reward,
            };
            if slot.is_none() {
                *slot = Some(comment);
                continue;
            }

            let outcome = report.outcome_mut(managed.kind);
            match self.tracker.delete_comment(repo, comment.id).await {
                Ok(()) => {
                    obs::emit_comment_action(
                        &repo_name,
                        number,
                        managed.kind,
                        "deleted",
                        comment.id,
                    );
                    outcome.actions.push(CommentAction::Deleted {
                        comment_id: comment.id,
                    });
                }
                Err(e) => {
                    obs::emit_comment_error(&repo_name, number, managed.kind, &e);
                    outcome
                        .errors
                        .push(format!("delete duplicate {}: {e}", comment.id));
                }
            }
        }
        slots
    }

    /// Bring one kind's body up to date, creating the comment if needed.
    async fn converge(
        &self,
        repo: &RepoRef,
        number: u64,
        kind: CommentKind,
        current: Option<Comment>,
        desired: &DesiredComments,
    ) -> Converged {
        let repo_name = repo.to_string();
        let body = desired.body(kind);
        let mut outcome = KindOutcome::new(kind);

        let current = match current {
            Some(comment) if bodies_match(&comment.body, body) => {
                debug!(repo = %repo_name, issue = number, %kind, "comment up to date");
                Some(comment)
            }
            Some(comment) => match self.tracker.update_comment(repo, comment.id, body).await {
                Ok(updated) => {
                    obs::emit_comment_action(&repo_name, number, kind, "updated", comment.id);
                    outcome.actions.push(CommentAction::Updated {
                        comment_id: comment.id,
                        reason: UpdateReason::BodyChanged,
                    });
                    // Updates never move a comment.
                    Some(Comment {
                        created_at: comment.created_at,
                        ..updated
                    })
                }
                Err(e) => {
                    obs::emit_comment_error(&repo_name, number, kind, &e);
                    outcome.errors.push(format!("update {}: {e}", comment.id));
                    Some(comment)
                }
            },
            None => match self.tracker.create_comment(repo, number, body).await {
                Ok(created) => {
                    obs::emit_comment_action(&repo_name, number, kind, "created", created.id);
                    outcome.actions.push(CommentAction::Created {
                        comment_id: created.id,
                    });
                    Some(created)
                }
                Err(e) => {
                    obs::emit_comment_error(&repo_name, number, kind, &e);
                    outcome.errors.push(format!("create: {e}"));
                    None
                }
            },
        };
        outcome.comment_id = current.as_ref().map(|c| c.id);
        Converged { current, outcome }
    }

    /// If Reward sits above Eligible, swap their bodies in place.
    async fn order(
        &self,
        repo: &RepoRef,
        number: u64,
        eligible: &Comment,
        reward: &Comment,
        desired: &DesiredComments,
        report: &mut IssueReconciliation,
    ) {
        if eligible.position() < reward.position() {
            return;
        }
        let repo_name = repo.to_string();
        debug!(repo = %repo_name, issue = number, "reward comment precedes eligible; swapping");

        // The upper comment takes the Eligible body, the lower one Reward.
        for (kind, target) in [
            (CommentKind::Eligible, reward.id),
            (CommentKind::Reward, eligible.id),
        ] {
            let outcome = report.outcome_mut(kind);
            match self
                .tracker
                .update_comment(repo, target, desired.body(kind))
                .await
            {
                Ok(_) => {
                    obs::emit_comment_action(&repo_name, number, kind, "reordered", target);
                    outcome.actions.push(CommentAction::Updated {
                        comment_id: target,
                        reason: UpdateReason::Reordered,
                    });
                    outcome.comment_id = Some(target);
                }
                Err(e) => {
                    obs::emit_comment_error(&repo_name, number, kind, &e);
                    outcome.errors.push(format!("reorder into {target}: {e}"));
                }
            }
        }
    }
}

fn absorb(into: &mut KindOutcome, from: KindOutcome) {
    into.comment_id = from.comment_id;
    into.actions.extend(from.actions);
    into.errors.extend(from.errors);
}

/// Case-insensitive comparison that ignores line-ending style and
/// surrounding whitespace, which the tracker may normalise.
fn bodies_match(existing: &str, desired: &str) -> bool {
    let normalise = |s: &str| s.replace("\r\n", "\n").trim().to_lowercase();
    normalise(existing) == normalise(desired)
}

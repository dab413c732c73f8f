//! Global atomic counters for Bountyboard observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a command).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters. No allocations, no locking.
pub struct Metrics {
    issues_scored: AtomicU64,
    issues_skipped: AtomicU64,
    comment_actions: AtomicU64,
    comment_errors: AtomicU64,
    webhooks: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            issues_scored: AtomicU64::new(0),
            issues_skipped: AtomicU64::new(0),
            comment_actions: AtomicU64::new(0),
            comment_errors: AtomicU64::new(0),
            webhooks: AtomicU64::new(0),
        }
    }

    pub fn inc_issues_scored(&self) {
        self.issues_scored.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "issues_scored", "counter incremented");
    }

    pub fn inc_issues_skipped(&self) {
        self.issues_skipped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "issues_skipped", "counter incremented");
    }

    pub fn inc_comment_actions(&self) {
        self.comment_actions.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "comment_actions", "counter incremented");
    }

    pub fn inc_comment_errors(&self) {
        self.comment_errors.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "comment_errors", "counter incremented");
    }

    pub fn inc_webhooks(&self) {
        self.webhooks.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "webhooks", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            issues_scored = self.issues_scored(),
            issues_skipped = self.issues_skipped(),
            comment_actions = self.comment_actions(),
            comment_errors = self.comment_errors(),
            webhooks = self.webhooks(),
        );
    }

    pub fn issues_scored(&self) -> u64 {
        self.issues_scored.load(Ordering::Relaxed)
    }

    pub fn issues_skipped(&self) -> u64 {
        self.issues_skipped.load(Ordering::Relaxed)
    }

    pub fn comment_actions(&self) -> u64 {
        self.comment_actions.load(Ordering::Relaxed)
    }

    pub fn comment_errors(&self) -> u64 {
        self.comment_errors.load(Ordering::Relaxed)
    }

    pub fn webhooks(&self) -> u64 {
        self.webhooks.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.issues_scored.store(0, Ordering::Relaxed);
        self.issues_skipped.store(0, Ordering::Relaxed);
        self.comment_actions.store(0, Ordering::Relaxed);
        self.comment_errors.store(0, Ordering::Relaxed);
        self.webhooks.store(0, Ordering::Relaxed);
    }
}

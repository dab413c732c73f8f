//! Per-issue admission queue.
//!
//! Webhook deliveries for the same issue can arrive back to back. Each
//! handler calls [`IssueAdmissionQueue::wait`] with the issue key before
//! touching the issue and releases its [`AdmissionPermit`] when finished, so
//! handlers for one issue run one at a time in arrival order. Handlers for
//! different issues never wait on each other.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::domain::{BountyError, Result};

/// FIFO wait registry keyed by issue identity.
///
/// A key is present in the map while some caller holds its permit; the
/// deque holds the callers waiting behind it.
#[derive(Debug, Default)]
pub struct IssueAdmissionQueue {
    queues: Mutex<HashMap<String, VecDeque<oneshot::Sender<()>>>>,
    timeout: Option<Duration>,
}

impl IssueAdmissionQueue {
    /// Queue whose waiters block until admitted, however long that takes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue whose waiters give up after `timeout`, when set.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Block until every earlier waiter for `key` is done.
    ///
    /// Fails with [`BountyError::AdmissionTimeout`] when a timeout is
    /// configured and elapses first; the abandoned slot is skipped.
    pub async fn wait(&self, key: &str) -> Result<AdmissionPermit<'_>> {
        let mut pending = {
            let mut queues = self.lock();
            match queues.get_mut(key) {
                None => {
                    queues.insert(key.to_string(), VecDeque::new());
                    return Ok(self.permit(key));
                }
                Some(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push_back(tx);
                    debug!(key, position = waiters.len(), "waiting for admission");
                    PendingAdmission {
                        queue: self,
                        key,
                        rx,
                        admitted: false,
                    }
                }
            }
        };

        let Some(timeout) = self.timeout else {
            // Senders are only dropped after `done` pops them, which either
            // admits us or finds us gone.
            let _ = (&mut pending.rx).await;
            return Ok(pending.admit());
        };

        if tokio::time::timeout(timeout, &mut pending.rx).await.is_ok() {
            return Ok(pending.admit());
        }
        if pending.abandon() {
            // The handover raced the deadline.
            return Ok(pending.admit());
        }
        warn!(key, timeout_ms = timeout.as_millis() as u64, "admission timed out");
        Err(BountyError::AdmissionTimeout {
            key: key.to_string(),
            waited_ms: timeout.as_millis() as u64,
        })
    }

    /// Release `key` to the next live waiter, or free it when none remain.
    pub fn done(&self, key: &str) {
        let mut queues = self.lock();
        let Some(waiters) = queues.get_mut(key) else {
            warn!(key, "done called without a matching wait");
            return;
        };
        while let Some(next) = waiters.pop_front() {
            if next.send(()).is_ok() {
                return;
            }
        }
        queues.remove(key);
    }

    /// Number of callers waiting behind the current holder of `key`.
    pub fn waiting(&self, key: &str) -> usize {
        self.lock().get(key).map_or(0, VecDeque::len)
    }

    /// Whether some caller currently holds `key`.
    pub fn is_held(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn permit(&self, key: &str) -> AdmissionPermit<'_> {
        AdmissionPermit {
            queue: self,
            key: key.to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<oneshot::Sender<()>>>> {
        self.queues.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A caller queued behind the holder of `key`.
///
/// Dropped before admission (timeout, or the waiting future cancelled), it
/// closes its slot. If the key was already handed to it, the key is passed
/// on so it never stays held by nobody.
struct PendingAdmission<'q, 'k> {
    queue: &'q IssueAdmissionQueue,
    key: &'k str,
    rx: oneshot::Receiver<()>,
    admitted: bool,
}

impl<'q> PendingAdmission<'q, '_> {
    fn admit(mut self) -> AdmissionPermit<'q> {
        self.admitted = true;
        self.queue.permit(self.key)
    }

    /// Close the slot. Returns whether the key had been handed over anyway.
    fn abandon(&mut self) -> bool {
        self.rx.close();
        self.rx.try_recv().is_ok()
    }
}

impl Drop for PendingAdmission<'_, '_> {
    fn drop(&mut self) {
        if !self.admitted && self.abandon() {
            debug!(key = self.key, "admitted waiter went away; passing the key on");
            self.queue.done(self.key);
        }
    }
}

/// Exclusive access to one issue. Dropping it calls
/// [`IssueAdmissionQueue::done`].
#[derive(Debug)]
#[must_use = "dropping the permit immediately releases the issue"]
pub struct AdmissionPermit<'a> {
    queue: &'a IssueAdmissionQueue,
    key: String,
}

impl AdmissionPermit<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.queue.done(&self.key);
    }
}

//! Resolution of legacy bounty-hunter pseudonyms.
//!
//! Red-team credits on migrated issues name hunters by the pseudonym they
//! used in the legacy system. [`IdentityCache`] remembers every pseudonym an
//! [`IdentityResolver`] has resolved for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::User;
use crate::tracker::TrackerResult;

/// Looks up the tracker identity behind a pseudonym.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `Ok(None)` when no account matches.
    async fn resolve(&self, pseudonym: &str) -> TrackerResult<Option<User>>;
}

/// Process-wide pseudonym → identity cache. Entries are never evicted.
#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: Mutex<HashMap<String, User>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(pseudonym: &str) -> String {
        pseudonym.trim().to_lowercase()
    }

    pub fn get(&self, pseudonym: &str) -> Option<User> {
        self.lock().get(&Self::key(pseudonym)).cloned()
    }

    pub fn insert(&self, pseudonym: &str, user: User) {
        self.lock().insert(Self::key(pseudonym), user);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Cached identity for `pseudonym`, asking `resolver` on a miss.
    ///
    /// Unknown pseudonyms fall back to a bare user named after the
    /// pseudonym and are not cached, so a later lookup can still succeed.
    pub async fn resolve(
        &self,
        resolver: &dyn IdentityResolver,
        pseudonym: &str,
    ) -> TrackerResult<User> {
        if let Some(user) = self.get(pseudonym) {
            return Ok(user);
        }
        match resolver.resolve(pseudonym.trim()).await? {
            Some(user) => {
                debug!(pseudonym, login = %user.login, "resolved bounty hunter");
                self.insert(pseudonym, user.clone());
                Ok(user)
            }
            None => Ok(User::named(pseudonym.trim())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, User>> {
        // A poisoned map is still a valid cache.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

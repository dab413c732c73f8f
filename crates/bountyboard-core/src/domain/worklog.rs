//! Work intervals credited to contributors.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A `[start, end]` interval during which one contributor worked an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLog {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WorkLog {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Length of the interval; inverted intervals count as zero.
    pub fn duration(&self) -> Duration {
        (self.end - self.start).max(Duration::zero())
    }
}

/// Work intervals per contributor login.
///
/// Intervals of one contributor are kept in the order they were opened and
/// are summed, not merged, so overlapping intervals both count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkLogs(BTreeMap<String, Vec<WorkLog>>);

impl WorkLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, login: &str, log: WorkLog) {
        self.0.entry(login.to_string()).or_default().push(log);
    }

    pub fn get(&self, login: &str) -> Option<&[WorkLog]> {
        self.0.get(login).map(Vec::as_slice)
    }

    pub fn get_mut(&mut self, login: &str) -> Option<&mut Vec<WorkLog>> {
        self.0.get_mut(login)
    }

    /// Summed duration worked by `login`.
    pub fn worked(&self, login: &str) -> Duration {
        self.0
            .get(login)
            .map(|logs| {
                logs.iter()
                    .fold(Duration::zero(), |acc, log| acc + log.duration())
            })
            .unwrap_or_else(Duration::zero)
    }

    /// Summed duration across all contributors.
    pub fn total_worked(&self) -> Duration {
        self.0
            .keys()
            .fold(Duration::zero(), |acc, login| acc + self.worked(login))
    }

    pub fn logins(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[WorkLog])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

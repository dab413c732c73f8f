//! Issue comments and the managed comment kinds.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment as returned by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    /// Login of the author.
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Sort key matching the order comments appear in on the issue.
    pub fn position(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.id)
    }
}

/// The status comments the bot owns on every issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    /// Checklist of prerequisites for scoring.
    Eligible,
    /// Contributor reward table or the reason none was computed.
    Reward,
}

impl CommentKind {
    /// Canonical on-issue order.
    pub const ALL: [CommentKind; 2] = [CommentKind::Eligible, CommentKind::Reward];

    pub fn as_str(self) -> &'static str {
        match self {
            CommentKind::Eligible => "eligible",
            CommentKind::Reward => "reward",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "eligible" => Some(CommentKind::Eligible),
            "reward" => Some(CommentKind::Reward),
            _ => None,
        }
    }
}

impl fmt::Display for CommentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

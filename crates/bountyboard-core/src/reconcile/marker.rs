//! Recognising the comments the bot owns.
//!
//! Managed bodies start with an HTML comment carrying a small JSON header,
//! invisible once rendered:
//!
//! ```text
//! <!-- {"type":"reward","version":"1"} -->
//! ### Reward summary
//! ...
//! ```
//!
//! Comments posted before the header existed are recognised by their
//! headline instead, as long as `comments.legacy_markers` is on.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::CommentConfig;
use crate::domain::{Comment, CommentKind};

const HEADER_PATTERN: &str = r"^\s*<!--\s*(\{.*?\})\s*-->";

/// Headlines used by bodies that predate the structured header.
const LEGACY_HEADLINES: [(CommentKind, &str); 2] = [
    (CommentKind::Eligible, "## reward eligibility"),
    (CommentKind::Reward, "## reward summary"),
];

fn header_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(HEADER_PATTERN).ok()).as_ref()
}

/// The JSON payload of a managed comment's first line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentHeader {
    #[serde(rename = "type")]
    pub kind: CommentKind,
    pub version: String,
}

impl CommentHeader {
    pub fn new(kind: CommentKind, version: impl Into<String>) -> Self {
        Self {
            kind,
            version: version.into(),
        }
    }

    /// `<!-- {"type":"…","version":"…"} -->`
    pub fn render(&self) -> String {
        let json = serde_json::json!({ "type": self.kind, "version": self.version });
        format!("<!-- {json} -->")
    }

    /// Read the header at the top of `body`. Unknown types and malformed
    /// JSON yield `None`.
    pub fn parse(body: &str) -> Option<Self> {
        let captures = header_regex()?.captures(body)?;
        serde_json::from_str(captures.get(1)?.as_str()).ok()
    }
}

/// Which rule claimed a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    Header,
    Legacy,
}

/// A comment recognised as one of ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedComment {
    pub kind: CommentKind,
    pub rule: MatchRule,
    /// Header version; `None` for legacy bodies.
    pub version: Option<String>,
}

/// Decides ownership and kind of existing comments.
#[derive(Debug, Clone)]
pub struct CommentMatcher {
    bot_login: String,
    legacy_markers: bool,
}

impl CommentMatcher {
    pub fn new(bot_login: impl Into<String>, legacy_markers: bool) -> Self {
        Self {
            bot_login: bot_login.into(),
            legacy_markers,
        }
    }

    pub fn from_config(config: &CommentConfig) -> Self {
        Self::new(config.bot_login.clone(), config.legacy_markers)
    }

    pub fn bot_login(&self) -> &str {
        &self.bot_login
    }

    pub fn is_bot(&self, login: &str) -> bool {
        login.eq_ignore_ascii_case(&self.bot_login)
    }

    /// `Some` only for comments authored by the bot that carry a managed
    /// header or, with legacy markers on, a legacy headline.
    pub fn classify(&self, comment: &Comment) -> Option<ManagedComment> {
        if !self.is_bot(&comment.author) {
            return None;
        }
        if let Some(header) = CommentHeader::parse(&comment.body) {
            return Some(ManagedComment {
                kind: header.kind,
                rule: MatchRule::Header,
                version: Some(header.version),
            });
        }
        if !self.legacy_markers {
            return None;
        }
        legacy_kind(&comment.body).map(|kind| ManagedComment {
            kind,
            rule: MatchRule::Legacy,
            version: None,
        })
    }
}

fn legacy_kind(body: &str) -> Option<CommentKind> {
    let headline = body.lines().map(str::trim).find(|l| !l.is_empty())?;
    let headline = headline.to_lowercase();
    LEGACY_HEADLINES
        .iter()
        .find(|(_, marker)| {
            headline
                .strip_prefix(marker)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        })
        .map(|(kind, _)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn comment(author: &str, body: &str) -> Comment {
        Comment {
            id: 1,
            author: author.into(),
            body: body.into(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_header_round_trips() {
        let header = CommentHeader::new(CommentKind::Reward, "1");
        let rendered = header.render();
        assert_eq!(rendered, r#"<!-- {"type":"reward","version":"1"} -->"#);
        assert_eq!(CommentHeader::parse(&format!("{rendered}\nbody")), Some(header));
    }

    #[test]
    fn test_unknown_header_type_is_not_managed() {
        assert!(CommentHeader::parse(r#"<!-- {"type":"summary","version":"1"} -->"#).is_none());
        assert!(CommentHeader::parse("<!-- not json -->").is_none());
        assert!(CommentHeader::parse("plain text").is_none());
    }

    #[test]
    fn test_only_bot_comments_are_claimed() {
        let matcher = CommentMatcher::new("bountyboard[bot]", true);
        let body = r#"<!-- {"type":"eligible","version":"1"} -->"#;
        assert!(matcher.classify(&comment("mallory", body)).is_none());

        let managed = matcher.classify(&comment("BountyBoard[bot]", body)).unwrap();
        assert_eq!(managed.kind, CommentKind::Eligible);
        assert_eq!(managed.rule, MatchRule::Header);
        assert_eq!(managed.version.as_deref(), Some("1"));
    }

    #[test]
    fn test_legacy_headline_needs_switch() {
        let body = "\n## Reward summary\n\n| Contributor | Reward |";
        let on = CommentMatcher::new("bountyboard[bot]", true);
        let off = CommentMatcher::new("bountyboard[bot]", false);

        let managed = on.classify(&comment("bountyboard[bot]", body)).unwrap();
        assert_eq!(managed.kind, CommentKind::Reward);
        assert_eq!(managed.rule, MatchRule::Legacy);
        assert!(off.classify(&comment("bountyboard[bot]", body)).is_none());
    }

    #[test]
    fn test_legacy_headline_must_match_whole_word() {
        let matcher = CommentMatcher::new("bountyboard[bot]", true);
        assert!(matcher
            .classify(&comment("bountyboard[bot]", "## Reward summaryish"))
            .is_none());
        assert!(matcher
            .classify(&comment("bountyboard[bot]", "thanks! ## Reward summary"))
            .is_none());
    }
}

//! Error types for bountyboard-github

use bountyboard_core::TrackerError;
use thiserror::Error;

/// Errors raised by the GitHub adapter
#[derive(Error, Debug)]
pub enum GithubError {
    /// The resource does not exist or the token cannot see it
    #[error("GitHub resource not found: {0}")]
    NotFound(String),

    /// Primary or secondary rate limit hit
    #[error("GitHub rate limit exceeded (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-success response
    #[error("GitHub responded with status {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, TLS or timeout failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body did not have the expected shape
    #[error("failed to decode GitHub response: {0}")]
    Decode(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bad `GITHUB_*` setting
    #[error("invalid GitHub configuration: {0}")]
    Config(String),

    /// `X-Hub-Signature-256` header is missing or malformed
    #[error("malformed webhook signature: {0}")]
    SignatureFormat(String),

    /// Payload was not signed with the configured secret
    #[error("webhook signature does not match payload")]
    SignatureMismatch,
}

impl GithubError {
    /// Classify a non-success response.
    ///
    /// GitHub answers an exhausted rate limit with 403 or 429; a 403 only
    /// counts as rate limiting when the response says so through its
    /// headers.
    pub fn from_response(
        status: u16,
        retry_after_secs: Option<u64>,
        rate_limit_exhausted: bool,
        url: &str,
        message: String,
    ) -> Self {
        match status {
            404 => GithubError::NotFound(url.to_string()),
            429 => GithubError::RateLimited { retry_after_secs },
            403 if rate_limit_exhausted || retry_after_secs.is_some() => {
                GithubError::RateLimited { retry_after_secs }
            }
            _ => GithubError::Status { status, message },
        }
    }
}

impl From<reqwest::Error> for GithubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GithubError::Decode(err.to_string())
        } else {
            GithubError::Http(err.to_string())
        }
    }
}

impl From<GithubError> for TrackerError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::NotFound(what) => TrackerError::NotFound(what),
            GithubError::RateLimited { retry_after_secs } => {
                TrackerError::RateLimited { retry_after_secs }
            }
            GithubError::Status { status, message } => TrackerError::Status { status, message },
            GithubError::Http(msg) => TrackerError::Transport(msg),
            GithubError::Decode(msg) => TrackerError::Decode(msg),
            GithubError::Json(e) => TrackerError::Decode(e.to_string()),
            other => TrackerError::Transport(other.to_string()),
        }
    }
}

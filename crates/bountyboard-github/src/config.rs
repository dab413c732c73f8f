//! GitHub connection settings.

use serde::{Deserialize, Serialize};

use crate::error::GithubError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubConfig {
    /// REST API root, e.g. `https://github.example.com/api/v3` for GHES
    pub api_url: String,
    /// Token sent as a bearer credential. Reads of public repositories
    /// work without one; comment writes do not.
    pub token: Option<String>,
    /// Shared secret webhook deliveries are signed with
    pub webhook_secret: Option<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Page size for list endpoints (GitHub caps it at 100)
    pub per_page: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        GithubConfig {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            webhook_secret: None,
            user_agent: format!("bountyboard/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            per_page: 100,
        }
    }
}

impl GithubConfig {
    /// Read `GITHUB_API_URL`, `GITHUB_TOKEN` and `GITHUB_WEBHOOK_SECRET`.
    pub fn from_env() -> Result<Self, GithubError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, GithubError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = GithubConfig::default();
        if let Some(url) = non_empty("GITHUB_API_URL") {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }
        config.token = non_empty("GITHUB_TOKEN");
        config.webhook_secret = non_empty("GITHUB_WEBHOOK_SECRET");
        config.validate()?;
        Ok(config)
    }

    /// Config for a specific API root
    pub fn new(api_url: &str) -> Self {
        GithubConfig {
            api_url: api_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn validate(&self) -> Result<(), GithubError> {
        if !(self.api_url.starts_with("https://") || self.api_url.starts_with("http://")) {
            return Err(GithubError::Config(format!(
                "GITHUB_API_URL must be an http(s) URL, got `{}`",
                self.api_url
            )));
        }
        if self.per_page == 0 || self.per_page > 100 {
            return Err(GithubError::Config(format!(
                "per_page must be between 1 and 100, got {}",
                self.per_page
            )));
        }
        Ok(())
    }
}

//! GitHub REST client.
//!
//! [`GithubClient`] is Bountyboard's production [`IssueTracker`] and
//! [`IdentityResolver`]. List endpoints are walked page by page until a
//! short page comes back.

use std::time::Duration;

use async_trait::async_trait;
use bountyboard_core::domain::{Comment, Issue, IssueEvent, RepoRef, User};
use bountyboard_core::{IdentityResolver, IssueTracker, TrackerResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::GithubConfig;
use crate::error::GithubError;
use crate::model::{
    linked_pull_requests, ApiComment, ApiIssue, ApiIssueEvent, ApiTimelineEvent, ApiUser,
    CommentBody,
};

const API_VERSION: &str = "2022-11-28";

/// GitHub API client
pub struct GithubClient {
    config: GithubConfig,
    http: reqwest::Client,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Result<Self, GithubError> {
        config.validate()?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(GithubClient { config, http })
    }

    /// Create client from `GITHUB_*` environment variables
    pub fn from_env() -> Result<Self, GithubError> {
        Self::new(GithubConfig::from_env()?)
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    fn repo_path(repo: &RepoRef) -> String {
        format!("/repos/{}/{}", repo.owner, repo.name)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.config.api_url, path));
        match &self.config.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send and turn every non-2xx answer into a [`GithubError`].
    async fn execute(&self, req: RequestBuilder, path: &str) -> Result<Response, GithubError> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let retry_after = header("retry-after").and_then(|v| v.trim().parse().ok());
        let exhausted = header("x-ratelimit-remaining").is_some_and(|v| v.trim() == "0");

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(text);
        debug!(path, status = status.as_u16(), %message, "GitHub request failed");

        Err(GithubError::from_response(
            status.as_u16(),
            retry_after,
            exhausted,
            path,
            message,
        ))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GithubError> {
        let response = self.execute(self.request(Method::GET, path), path).await?;
        Ok(response.json().await?)
    }

    async fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, GithubError> {
        let per_page = self.config.per_page;
        let mut items = Vec::new();
        let mut page: u32 = 1;
        loop {
            let req = self
                .request(Method::GET, path)
                .query(query)
                .query(&[("per_page", per_page), ("page", page)]);
            let batch: Vec<T> = self.execute(req, path).await?.json().await?;
            let len = batch.len();
            items.extend(batch);
            if len < per_page as usize {
                break;
            }
            page += 1;
        }
        debug!(path, pages = page, items = items.len(), "fetched paginated list");
        Ok(items)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &str,
    ) -> Result<T, GithubError> {
        let req = self.request(method, path).json(&CommentBody { body });
        Ok(self.execute(req, path).await?.json().await?)
    }
}

#[async_trait]
impl IssueTracker for GithubClient {
    async fn list_issues(&self, repo: &RepoRef) -> TrackerResult<Vec<Issue>> {
        let path = format!("{}/issues", Self::repo_path(repo));
        let issues: Vec<ApiIssue> = self.get_paginated(&path, &[("state", "all")]).await?;
        Ok(issues.into_iter().map(Issue::from).collect())
    }

    async fn get_issue(&self, repo: &RepoRef, number: u64) -> TrackerResult<Issue> {
        let path = format!("{}/issues/{number}", Self::repo_path(repo));
        let issue: ApiIssue = self.get_json(&path).await?;
        Ok(issue.into())
    }

    async fn list_issue_events(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> TrackerResult<Vec<IssueEvent>> {
        let path = format!("{}/issues/{number}/events", Self::repo_path(repo));
        let events: Vec<ApiIssueEvent> = self.get_paginated(&path, &[]).await?;
        Ok(events.into_iter().map(IssueEvent::from).collect())
    }

    async fn list_linked_pull_requests(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> TrackerResult<Vec<u64>> {
        let path = format!("{}/issues/{number}/timeline", Self::repo_path(repo));
        let timeline: Vec<ApiTimelineEvent> = self.get_paginated(&path, &[]).await?;
        Ok(linked_pull_requests(timeline))
    }

    async fn list_comments(&self, repo: &RepoRef, number: u64) -> TrackerResult<Vec<Comment>> {
        let path = format!("{}/issues/{number}/comments", Self::repo_path(repo));
        let comments: Vec<ApiComment> = self.get_paginated(&path, &[]).await?;
        Ok(comments.into_iter().map(Comment::from).collect())
    }

    async fn create_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> TrackerResult<Comment> {
        let path = format!("{}/issues/{number}/comments", Self::repo_path(repo));
        let comment: ApiComment = self.send_json(Method::POST, &path, body).await?;
        info!(repo = %repo, issue = number, comment_id = comment.id, "created comment");
        Ok(comment.into())
    }

    async fn update_comment(
        &self,
        repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> TrackerResult<Comment> {
        let path = format!("{}/issues/comments/{comment_id}", Self::repo_path(repo));
        let comment: ApiComment = self.send_json(Method::PATCH, &path, body).await?;
        info!(repo = %repo, comment_id, "updated comment");
        Ok(comment.into())
    }

    async fn delete_comment(&self, repo: &RepoRef, comment_id: u64) -> TrackerResult<()> {
        let path = format!("{}/issues/comments/{comment_id}", Self::repo_path(repo));
        self.execute(self.request(Method::DELETE, &path), &path)
            .await?;
        info!(repo = %repo, comment_id, "deleted comment");
        Ok(())
    }
}

/// Whether `login` could be a GitHub account name.
fn plausible_login(login: &str) -> bool {
    !login.is_empty()
        && login.len() <= 39
        && !login.starts_with('-')
        && login.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[async_trait]
impl IdentityResolver for GithubClient {
    async fn resolve(&self, pseudonym: &str) -> TrackerResult<Option<User>> {
        let login = pseudonym.trim();
        if !plausible_login(login) {
            debug!(pseudonym, "pseudonym cannot be a GitHub login");
            return Ok(None);
        }
        match self.get_json::<ApiUser>(&format!("/users/{login}")).await {
            Ok(user) => Ok(Some(user.into())),
            Err(GithubError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plausible_login() {
        assert!(plausible_login("zero-cool"));
        assert!(plausible_login("Acid42"));
        assert!(!plausible_login("acid_burn"));
        assert!(!plausible_login("-dash"));
        assert!(!plausible_login("has space"));
        assert!(!plausible_login(""));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = GithubConfig::new("not-a-url");
        assert!(matches!(
            GithubClient::new(config),
            Err(GithubError::Config(_))
        ));
    }
}

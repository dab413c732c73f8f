//! In-memory fakes for the tracker seams (testing only)
//!
//! [`MemoryTracker`] implements both [`IssueTracker`] and
//! [`IdentityResolver`] over plain maps, records every successful comment
//! write and can be told to fail specific calls.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{Comment, Issue, IssueEvent, RepoRef, User};
use crate::identity::IdentityResolver;
use crate::tracker::{IssueTracker, TrackerError, TrackerResult};

/// A comment write that reached the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    Create { number: u64, comment_id: u64 },
    Update { comment_id: u64 },
    Delete { comment_id: u64 },
}

#[derive(Debug, Default)]
struct RepoState {
    issues: BTreeMap<u64, Issue>,
    events: HashMap<u64, Vec<IssueEvent>>,
    pull_requests: HashMap<u64, Vec<u64>>,
    comments: BTreeMap<u64, Vec<Comment>>,
}

#[derive(Debug)]
struct State {
    repos: HashMap<String, RepoState>,
    identities: HashMap<String, User>,
    writes: Vec<TrackerCall>,
    failing_repos: HashSet<String>,
    failing_events: HashSet<(String, u64)>,
    failing_creates: HashSet<(String, u64)>,
    failing_comments: HashSet<u64>,
    next_comment_id: u64,
    clock: DateTime<Utc>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            repos: HashMap::new(),
            identities: HashMap::new(),
            writes: Vec::new(),
            failing_repos: HashSet::new(),
            failing_events: HashSet::new(),
            failing_creates: HashSet::new(),
            failing_comments: HashSet::new(),
            next_comment_id: 1,
            clock: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }
}

impl State {
    /// Comments get increasing timestamps, one minute apart, in creation order.
    fn stamp(&mut self) -> (u64, DateTime<Utc>) {
        let id = self.next_comment_id;
        self.next_comment_id += 1;
        self.clock += Duration::minutes(1);
        (id, self.clock)
    }

    fn find_comment_mut(&mut self, repo: &str, comment_id: u64) -> Option<&mut Comment> {
        self.repos
            .get_mut(repo)?
            .comments
            .values_mut()
            .flat_map(|c| c.iter_mut())
            .find(|c| c.id == comment_id)
    }
}

/// In-memory issue tracker and identity directory.
#[derive(Debug)]
pub struct MemoryTracker {
    state: Mutex<State>,
    bot_login: String,
}

impl Default for MemoryTracker {
    fn default() -> Self {
        Self::with_bot_login("bountyboard[bot]")
    }
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Comments created through the trait are authored by `bot_login`.
    pub fn with_bot_login(bot_login: &str) -> Self {
        Self {
            state: Mutex::new(State::default()),
            bot_login: bot_login.to_string(),
        }
    }

    pub fn add_issue(&self, repo: &RepoRef, issue: Issue) {
        let mut state = self.state.lock().unwrap();
        state
            .repos
            .entry(repo.to_string())
            .or_default()
            .issues
            .insert(issue.number, issue);
    }

    pub fn set_events(&self, repo: &RepoRef, number: u64, events: Vec<IssueEvent>) {
        let mut state = self.state.lock().unwrap();
        state
            .repos
            .entry(repo.to_string())
            .or_default()
            .events
            .insert(number, events);
    }

    pub fn set_pull_requests(&self, repo: &RepoRef, number: u64, prs: Vec<u64>) {
        let mut state = self.state.lock().unwrap();
        state
            .repos
            .entry(repo.to_string())
            .or_default()
            .pull_requests
            .insert(number, prs);
    }

    /// Seed an existing comment. Not recorded as a write.
    pub fn add_comment(&self, repo: &RepoRef, number: u64, author: &str, body: &str) -> Comment {
        let mut state = self.state.lock().unwrap();
        let (id, created_at) = state.stamp();
        let comment = Comment {
            id,
            author: author.to_string(),
            body: body.to_string(),
            created_at,
        };
        state
            .repos
            .entry(repo.to_string())
            .or_default()
            .comments
            .entry(number)
            .or_default()
            .push(comment.clone());
        comment
    }

    pub fn add_identity(&self, pseudonym: &str, user: User) {
        let mut state = self.state.lock().unwrap();
        state.identities.insert(pseudonym.to_lowercase(), user);
    }

    /// Current comments of an issue, oldest first.
    pub fn comments(&self, repo: &RepoRef, number: u64) -> Vec<Comment> {
        let state = self.state.lock().unwrap();
        let mut comments = state
            .repos
            .get(&repo.to_string())
            .and_then(|r| r.comments.get(&number))
            .cloned()
            .unwrap_or_default();
        comments.sort_by_key(Comment::position);
        comments
    }

    pub fn writes(&self) -> Vec<TrackerCall> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().unwrap().writes.clear();
    }

    /// Make `list_issues` fail for `repo`.
    pub fn fail_repository(&self, repo: &RepoRef) {
        self.state.lock().unwrap().failing_repos.insert(repo.to_string());
    }

    /// Make `list_issue_events` fail for one issue.
    pub fn fail_events(&self, repo: &RepoRef, number: u64) {
        self.state
            .lock()
            .unwrap()
            .failing_events
            .insert((repo.to_string(), number));
    }

    /// Make `create_comment` fail for one issue.
    pub fn fail_creates(&self, repo: &RepoRef, number: u64) {
        self.state
            .lock()
            .unwrap()
            .failing_creates
            .insert((repo.to_string(), number));
    }

    /// Make updates and deletes of one comment fail.
    pub fn fail_comment(&self, comment_id: u64) {
        self.state.lock().unwrap().failing_comments.insert(comment_id);
    }

    pub fn heal(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_repos.clear();
        state.failing_events.clear();
        state.failing_creates.clear();
        state.failing_comments.clear();
    }
}

fn injected() -> TrackerError {
    TrackerError::Status {
        status: 500,
        message: "injected failure".to_string(),
    }
}

#[async_trait]
impl IssueTracker for MemoryTracker {
    async fn list_issues(&self, repo: &RepoRef) -> TrackerResult<Vec<Issue>> {
        let state = self.state.lock().unwrap();
        let key = repo.to_string();
        if state.failing_repos.contains(&key) {
            return Err(TrackerError::Transport(format!("{key} is unreachable")));
        }
        state
            .repos
            .get(&key)
            .map(|r| r.issues.values().cloned().collect())
            .ok_or(TrackerError::NotFound(key))
    }

    async fn get_issue(&self, repo: &RepoRef, number: u64) -> TrackerResult<Issue> {
        let state = self.state.lock().unwrap();
        state
            .repos
            .get(&repo.to_string())
            .and_then(|r| r.issues.get(&number))
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(repo.issue_key(number)))
    }

    async fn list_issue_events(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> TrackerResult<Vec<IssueEvent>> {
        let state = self.state.lock().unwrap();
        if state.failing_events.contains(&(repo.to_string(), number)) {
            return Err(injected());
        }
        Ok(state
            .repos
            .get(&repo.to_string())
            .and_then(|r| r.events.get(&number))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_linked_pull_requests(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> TrackerResult<Vec<u64>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .repos
            .get(&repo.to_string())
            .and_then(|r| r.pull_requests.get(&number))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_comments(&self, repo: &RepoRef, number: u64) -> TrackerResult<Vec<Comment>> {
        Ok(self.comments(repo, number))
    }

    async fn create_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> TrackerResult<Comment> {
        let mut state = self.state.lock().unwrap();
        if state.failing_creates.contains(&(repo.to_string(), number)) {
            return Err(injected());
        }
        let (id, created_at) = state.stamp();
        let comment = Comment {
            id,
            author: self.bot_login.clone(),
            body: body.to_string(),
            created_at,
        };
        state
            .repos
            .entry(repo.to_string())
            .or_default()
            .comments
            .entry(number)
            .or_default()
            .push(comment.clone());
        state.writes.push(TrackerCall::Create {
            number,
            comment_id: id,
        });
        Ok(comment)
    }

    async fn update_comment(
        &self,
        repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> TrackerResult<Comment> {
        let mut state = self.state.lock().unwrap();
        if state.failing_comments.contains(&comment_id) {
            return Err(injected());
        }
        let comment = state
            .find_comment_mut(&repo.to_string(), comment_id)
            .ok_or_else(|| TrackerError::NotFound(format!("comment {comment_id}")))?;
        comment.body = body.to_string();
        let updated = comment.clone();
        state.writes.push(TrackerCall::Update { comment_id });
        Ok(updated)
    }

    async fn delete_comment(&self, repo: &RepoRef, comment_id: u64) -> TrackerResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_comments.contains(&comment_id) {
            return Err(injected());
        }
        let repo_state = state
            .repos
            .get_mut(&repo.to_string())
            .ok_or_else(|| TrackerError::NotFound(repo.to_string()))?;
        let mut removed = false;
        for comments in repo_state.comments.values_mut() {
            let before = comments.len();
            comments.retain(|c| c.id != comment_id);
            removed |= comments.len() != before;
        }
        if !removed {
            return Err(TrackerError::NotFound(format!("comment {comment_id}")));
        }
        state.writes.push(TrackerCall::Delete { comment_id });
        Ok(())
    }
}

#[async_trait]
impl IdentityResolver for MemoryTracker {
    async fn resolve(&self, pseudonym: &str) -> TrackerResult<Option<User>> {
        let state = self.state.lock().unwrap();
        Ok(state.identities.get(&pseudonym.trim().to_lowercase()).cloned())
    }
}

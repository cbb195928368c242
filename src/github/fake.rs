//! In-memory GitHub for tests and local experiments.
//!
//! Reads are served from seeded state. Mutations are recorded and also applied
//! to that state, so a second event sees the labels, titles and comments the
//! first one produced.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{
    ChangedFile, Comment, CommitRef, CommitStatus, GitHubClient, Label, Mutation,
    PermissionLevel, PullRequest, Repo, RepositoryChange, User,
};
use crate::error::{BotError, Result};

/// Login the fake posts comments as.
pub const FAKE_BOT_LOGIN: &str = "pr-gate-bot";

#[derive(Debug, Default)]
struct FakeState {
    pull_requests: HashMap<(Repo, u64), PullRequest>,
    files: HashMap<(Repo, u64), Vec<ChangedFile>>,
    reviews: HashMap<(Repo, u64), Vec<String>>,
    comments: HashMap<(Repo, u64), Vec<Comment>>,
    permissions: HashMap<(Repo, String), PermissionLevel>,
    contents: HashMap<String, String>,
    urls: HashMap<String, String>,
    failing: HashSet<String>,
    mutations: Vec<Mutation>,
    calls: HashMap<String, usize>,
    next_comment_id: u64,
}

#[derive(Debug, Default)]
pub struct FakeGitHub {
    state: Mutex<FakeState>,
}

fn content_key(change: &RepositoryChange, path: &str) -> String {
    format!(
        "{}/{}@{}:{}",
        change.owner, change.repo_name, change.hash, path
    )
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A minimal open pull request with head SHA `sha-<number>`.
    pub fn pull_request(number: u64, title: &str, author: &str) -> PullRequest {
        PullRequest {
            number,
            title: title.to_string(),
            user: User {
                login: author.to_string(),
            },
            labels: Vec::new(),
            head: CommitRef {
                sha: format!("sha-{number}"),
            },
            requested_reviewers: Vec::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and fail it if the operation was marked failing.
    fn enter(&self, operation: &str) -> Result<MutexGuard<'_, FakeState>> {
        let mut state = self.state();
        *state.calls.entry(operation.to_string()).or_default() += 1;
        if state.failing.contains(operation) {
            return Err(BotError::GitHub {
                operation: operation.to_string(),
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(state)
    }

    // ── Seeding ──

    pub fn add_pull_request(&self, repo: &Repo, pr: PullRequest) {
        self.state()
            .pull_requests
            .insert((repo.clone(), pr.number), pr);
    }

    pub fn set_files(&self, repo: &Repo, number: u64, names: &[&str]) {
        let files = names
            .iter()
            .map(|name| ChangedFile {
                name: name.to_string(),
                status: "added".to_string(),
            })
            .collect();
        self.state().files.insert((repo.clone(), number), files);
    }

    pub fn add_review(&self, repo: &Repo, number: u64, login: &str) {
        self.state()
            .reviews
            .entry((repo.clone(), number))
            .or_default()
            .push(login.to_string());
    }

    pub fn add_comment(&self, repo: &Repo, number: u64, login: &str, body: &str) {
        let mut state = self.state();
        state.next_comment_id += 1;
        let id = state.next_comment_id;
        state
            .comments
            .entry((repo.clone(), number))
            .or_default()
            .push(Comment {
                id,
                body: body.to_string(),
                user: User {
                    login: login.to_string(),
                },
            });
    }

    pub fn set_permission(&self, repo: &Repo, login: &str, level: PermissionLevel) {
        self.state()
            .permissions
            .insert((repo.clone(), login.to_string()), level);
    }

    pub fn add_file_content(&self, change: &RepositoryChange, path: &str, content: &str) {
        self.state()
            .contents
            .insert(content_key(change, path), content.to_string());
    }

    pub fn add_url(&self, url: &str, body: &str) {
        self.state().urls.insert(url.to_string(), body.to_string());
    }

    /// Make every later call to `operation` (a trait method name) fail.
    pub fn fail_on(&self, operation: &str) {
        self.state().failing.insert(operation.to_string());
    }

    // ── Inspection ──

    pub fn mutations(&self) -> Vec<Mutation> {
        self.state().mutations.clone()
    }

    pub fn statuses(&self) -> Vec<CommitStatus> {
        self.state()
            .mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::CreateStatus { status, .. } => Some(status.clone()),
                _ => None,
            })
            .collect()
    }

    /// Comments posted through the client, oldest first.
    pub fn posted_comments(&self) -> Vec<String> {
        self.state()
            .mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::CreateComment { body, .. } => Some(body.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn current_pull_request(&self, repo: &Repo, number: u64) -> Option<PullRequest> {
        self.state()
            .pull_requests
            .get(&(repo.clone(), number))
            .cloned()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state().calls.get(operation).copied().unwrap_or(0)
    }
}

impl GitHubClient for FakeGitHub {
    fn get_pull_request(&self, repo: &Repo, number: u64) -> Result<PullRequest> {
        let state = self.enter("get_pull_request")?;
        state
            .pull_requests
            .get(&(repo.clone(), number))
            .cloned()
            .ok_or_else(|| BotError::GitHub {
                operation: "get_pull_request".to_string(),
                status: 404,
                body: format!("no pull request {repo}#{number}"),
            })
    }

    fn list_pull_request_files(&self, repo: &Repo, number: u64) -> Result<Vec<ChangedFile>> {
        let state = self.enter("list_pull_request_files")?;
        Ok(state
            .files
            .get(&(repo.clone(), number))
            .cloned()
            .unwrap_or_default())
    }

    fn list_reviews(&self, repo: &Repo, number: u64) -> Result<Vec<String>> {
        let state = self.enter("list_reviews")?;
        Ok(state
            .reviews
            .get(&(repo.clone(), number))
            .cloned()
            .unwrap_or_default())
    }

    fn list_issue_comments(&self, repo: &Repo, number: u64) -> Result<Vec<Comment>> {
        let state = self.enter("list_issue_comments")?;
        Ok(state
            .comments
            .get(&(repo.clone(), number))
            .cloned()
            .unwrap_or_default())
    }

    fn get_permission_level(&self, repo: &Repo, login: &str) -> Result<PermissionLevel> {
        let state = self.enter("get_permission_level")?;
        Ok(state
            .permissions
            .get(&(repo.clone(), login.to_string()))
            .copied()
            .unwrap_or(PermissionLevel::None))
    }

    fn get_file_content(&self, change: &RepositoryChange, path: &str) -> Result<Option<String>> {
        let state = self.enter("get_file_content")?;
        Ok(state.contents.get(&content_key(change, path)).cloned())
    }

    fn fetch_url(&self, url: &str) -> Result<Option<String>> {
        let state = self.enter("fetch_url")?;
        Ok(state.urls.get(url).cloned())
    }

    fn add_labels(&self, repo: &Repo, number: u64, labels: &[String]) -> Result<()> {
        let mut state = self.enter("add_labels")?;
        if let Some(pr) = state.pull_requests.get_mut(&(repo.clone(), number)) {
            for label in labels {
                if !pr.has_label(label) {
                    pr.labels.push(Label {
                        name: label.clone(),
                    });
                }
            }
        }
        state.mutations.push(Mutation::AddLabels {
            repo: repo.to_string(),
            number,
            labels: labels.to_vec(),
        });
        Ok(())
    }

    fn remove_label(&self, repo: &Repo, number: u64, label: &str) -> Result<()> {
        let mut state = self.enter("remove_label")?;
        if let Some(pr) = state.pull_requests.get_mut(&(repo.clone(), number)) {
            pr.labels.retain(|l| l.name != label);
        }
        state.mutations.push(Mutation::RemoveLabel {
            repo: repo.to_string(),
            number,
            label: label.to_string(),
        });
        Ok(())
    }

    fn edit_title(&self, repo: &Repo, number: u64, title: &str) -> Result<()> {
        let mut state = self.enter("edit_title")?;
        if let Some(pr) = state.pull_requests.get_mut(&(repo.clone(), number)) {
            pr.title = title.to_string();
        }
        state.mutations.push(Mutation::EditTitle {
            repo: repo.to_string(),
            number,
            title: title.to_string(),
        });
        Ok(())
    }

    fn create_status(&self, change: &RepositoryChange, status: &CommitStatus) -> Result<()> {
        let mut state = self.enter("create_status")?;
        state.mutations.push(Mutation::CreateStatus {
            repo: change.repo().to_string(),
            sha: change.hash.clone(),
            status: status.clone(),
        });
        Ok(())
    }

    fn create_comment(&self, repo: &Repo, number: u64, body: &str) -> Result<()> {
        let mut state = self.enter("create_comment")?;
        state.next_comment_id += 1;
        let id = state.next_comment_id;
        state
            .comments
            .entry((repo.clone(), number))
            .or_default()
            .push(Comment {
                id,
                body: body.to_string(),
                user: User {
                    login: FAKE_BOT_LOGIN.to_string(),
                },
            });
        state.mutations.push(Mutation::CreateComment {
            repo: repo.to_string(),
            number,
            body: body.to_string(),
        });
        Ok(())
    }
}

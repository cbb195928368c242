use std::cell::OnceCell;

use super::{GitHubClient, PullRequest, Repo};
use crate::error::Result;

/// Pull request behind a comment event, fetched on first use.
///
/// Comment payloads carry only the issue view of a PR. Most comments never
/// match a command, so the full PR is loaded only when a permission check or
/// command effect asks for it, and at most once per event.
pub struct LazyPullRequest<'a> {
    client: &'a dyn GitHubClient,
    repo: Repo,
    number: u64,
    loaded: OnceCell<PullRequest>,
}

impl<'a> LazyPullRequest<'a> {
    pub fn new(client: &'a dyn GitHubClient, repo: Repo, number: u64) -> Self {
        Self {
            client,
            repo,
            number,
            loaded: OnceCell::new(),
        }
    }

    /// Wrap a pull request that is already in hand (pull_request events).
    pub fn ready(client: &'a dyn GitHubClient, repo: Repo, pull_request: PullRequest) -> Self {
        let number = pull_request.number;
        let loaded = OnceCell::new();
        let _ = loaded.set(pull_request);
        Self {
            client,
            repo,
            number,
            loaded,
        }
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn load(&self) -> Result<&PullRequest> {
        if let Some(pr) = self.loaded.get() {
            return Ok(pr);
        }
        let pr = self.client.get_pull_request(&self.repo, self.number)?;
        Ok(self.loaded.get_or_init(|| pr))
    }
}

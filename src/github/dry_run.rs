use std::sync::{Mutex, PoisonError};

use log::info;

use super::{
    ChangedFile, Comment, CommitStatus, GitHubClient, Mutation, PermissionLevel, PullRequest,
    Repo, RepositoryChange,
};
use crate::error::Result;

/// Reads through to the wrapped client; records mutations instead of sending them.
pub struct DryRunClient<C> {
    inner: C,
    recorded: Mutex<Vec<Mutation>>,
}

impl<C: GitHubClient> DryRunClient<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            recorded: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, mutation: Mutation) -> Result<()> {
        info!("dry-run: skipping {mutation:?}");
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mutation);
        Ok(())
    }

    /// Mutations that would have been applied, in order.
    pub fn into_mutations(self) -> Vec<Mutation> {
        self.recorded
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: GitHubClient> GitHubClient for DryRunClient<C> {
    fn get_pull_request(&self, repo: &Repo, number: u64) -> Result<PullRequest> {
        self.inner.get_pull_request(repo, number)
    }

    fn list_pull_request_files(&self, repo: &Repo, number: u64) -> Result<Vec<ChangedFile>> {
        self.inner.list_pull_request_files(repo, number)
    }

    fn list_reviews(&self, repo: &Repo, number: u64) -> Result<Vec<String>> {
        self.inner.list_reviews(repo, number)
    }

    fn list_issue_comments(&self, repo: &Repo, number: u64) -> Result<Vec<Comment>> {
        self.inner.list_issue_comments(repo, number)
    }

    fn get_permission_level(&self, repo: &Repo, login: &str) -> Result<PermissionLevel> {
        self.inner.get_permission_level(repo, login)
    }

    fn get_file_content(&self, change: &RepositoryChange, path: &str) -> Result<Option<String>> {
        self.inner.get_file_content(change, path)
    }

    fn fetch_url(&self, url: &str) -> Result<Option<String>> {
        self.inner.fetch_url(url)
    }

    fn add_labels(&self, repo: &Repo, number: u64, labels: &[String]) -> Result<()> {
        self.record(Mutation::AddLabels {
            repo: repo.to_string(),
            number,
            labels: labels.to_vec(),
        })
    }

    fn remove_label(&self, repo: &Repo, number: u64, label: &str) -> Result<()> {
        self.record(Mutation::RemoveLabel {
            repo: repo.to_string(),
            number,
            label: label.to_string(),
        })
    }

    fn edit_title(&self, repo: &Repo, number: u64, title: &str) -> Result<()> {
        self.record(Mutation::EditTitle {
            repo: repo.to_string(),
            number,
            title: title.to_string(),
        })
    }

    fn create_status(&self, change: &RepositoryChange, status: &CommitStatus) -> Result<()> {
        self.record(Mutation::CreateStatus {
            repo: change.repo().to_string(),
            sha: change.hash.clone(),
            status: status.clone(),
        })
    }

    fn create_comment(&self, repo: &Repo, number: u64, body: &str) -> Result<()> {
        self.record(Mutation::CreateComment {
            repo: repo.to_string(),
            number,
            body: body.to_string(),
        })
    }
}

//! GitHub collaborator: data model, webhook events, and the client seam.
//!
//! Policy code only talks to [`GitHubClient`]. [`RestClient`] is the real
//! implementation, [`DryRunClient`] records mutations instead of sending them,
//! and `FakeGitHub` (behind the `test-util` feature) keeps everything in
//! memory for tests.

pub mod dry_run;
pub mod event;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod lazy;
pub mod rest;
pub mod status;

pub use dry_run::DryRunClient;
pub use event::{EventType, IssueCommentEvent, PullRequestEvent};
#[cfg(any(test, feature = "test-util"))]
pub use fake::FakeGitHub;
pub use lazy::LazyPullRequest;
pub use rest::RestClient;
pub use status::StatusService;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Owner and name of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Coordinates of the commit a policy decision is made for.
///
/// Configuration and custom message files are resolved against this commit,
/// so a decision is reproducible for a given SHA.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepositoryChange {
    pub owner: String,
    pub repo_name: String,
    pub hash: String,
}

impl RepositoryChange {
    /// Base repository plus head SHA, so fork PRs resolve through the base repo.
    pub fn for_pull_request(repo: &Repo, pr: &PullRequest) -> Self {
        Self {
            owner: repo.owner.clone(),
            repo_name: repo.name.clone(),
            hash: pr.head.sha.clone(),
        }
    }

    pub fn repo(&self) -> Repo {
        Repo::new(&self.owner, &self.repo_name)
    }

    /// Location of `path` at this commit on a raw-content host.
    pub fn raw_file_url(&self, raw_host: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            raw_host.trim_end_matches('/'),
            self.owner,
            self.repo_name,
            self.hash,
            path.trim_start_matches('/')
        )
    }

    /// Browsable location of `path` at this commit.
    pub fn blob_url(&self, path: &str) -> String {
        format!(
            "https://github.com/{}/{}/blob/{}/{}",
            self.owner,
            self.repo_name,
            self.hash,
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub user: User,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub head: CommitRef,
    #[serde(default)]
    pub requested_reviewers: Vec<User>,
}

impl PullRequest {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name == name)
    }
}

/// One entry of a pull request's changeset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    #[serde(rename = "filename")]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
    pub user: User,
}

/// A collaborator's permission level on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Admin,
    Write,
    Read,
    #[serde(other)]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Pending,
    Success,
    Failure,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub state: StatusState,
    pub description: String,
    pub context: String,
    pub target_url: String,
}

/// A state change the bot applies to GitHub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    AddLabels {
        repo: String,
        number: u64,
        labels: Vec<String>,
    },
    RemoveLabel {
        repo: String,
        number: u64,
        label: String,
    },
    EditTitle {
        repo: String,
        number: u64,
        title: String,
    },
    CreateStatus {
        repo: String,
        sha: String,
        status: CommitStatus,
    },
    CreateComment {
        repo: String,
        number: u64,
        body: String,
    },
}

/// Everything the policy engines need from GitHub.
///
/// Implementations apply their own timeouts; callers never retry.
pub trait GitHubClient: Send + Sync {
    fn get_pull_request(&self, repo: &Repo, number: u64) -> Result<PullRequest>;

    fn list_pull_request_files(&self, repo: &Repo, number: u64) -> Result<Vec<ChangedFile>>;

    /// Logins of users who submitted a review on the pull request.
    fn list_reviews(&self, repo: &Repo, number: u64) -> Result<Vec<String>>;

    fn list_issue_comments(&self, repo: &Repo, number: u64) -> Result<Vec<Comment>>;

    fn get_permission_level(&self, repo: &Repo, login: &str) -> Result<PermissionLevel>;

    /// Content of `path` at the change's commit, `None` if the file does not exist.
    fn get_file_content(&self, change: &RepositoryChange, path: &str) -> Result<Option<String>>;

    /// Body of `url`, `None` on any non-200 answer.
    fn fetch_url(&self, url: &str) -> Result<Option<String>>;

    fn add_labels(&self, repo: &Repo, number: u64, labels: &[String]) -> Result<()>;

    fn remove_label(&self, repo: &Repo, number: u64, label: &str) -> Result<()>;

    fn edit_title(&self, repo: &Repo, number: u64, title: &str) -> Result<()>;

    fn create_status(&self, change: &RepositoryChange, status: &CommitStatus) -> Result<()>;

    fn create_comment(&self, repo: &Repo, number: u64, body: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change() -> RepositoryChange {
        RepositoryChange {
            owner: "owner".into(),
            repo_name: "repo".into(),
            hash: "46cb8fac44709e4ccaae97448c65e8f7320cfea7".into(),
        }
    }

    #[test]
    fn raw_file_url_joins_segments() {
        assert_eq!(
            change().raw_file_url("https://raw.githubusercontent.com/", "/path/to/msg.md"),
            "https://raw.githubusercontent.com/owner/repo/46cb8fac44709e4ccaae97448c65e8f7320cfea7/path/to/msg.md"
        );
    }

    #[test]
    fn blob_url_points_at_commit() {
        assert_eq!(
            change().blob_url(".pr-gate/test-keeper.toml"),
            "https://github.com/owner/repo/blob/46cb8fac44709e4ccaae97448c65e8f7320cfea7/.pr-gate/test-keeper.toml"
        );
    }

    #[test]
    fn changed_file_reads_github_field_name() {
        let file: ChangedFile =
            serde_json::from_str(r#"{"filename": "src/lib.rs", "status": "added"}"#).unwrap();
        assert_eq!(file.name, "src/lib.rs");
    }

    #[test]
    fn permission_level_parses_lowercase() {
        let level: PermissionLevel = serde_json::from_str(r#""admin""#).unwrap();
        assert_eq!(level, PermissionLevel::Admin);
    }
}

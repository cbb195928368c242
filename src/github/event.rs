//! Webhook payload shapes for the two event types the bots react to.

use serde::Deserialize;

use super::{Label, PullRequest, Repo, User};

/// Event type as declared by the `X-GitHub-Event` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    PullRequest,
    IssueComment,
    Unknown(String),
}

impl EventType {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "pull_request" => EventType::PullRequest,
            "issue_comment" => EventType::IssueComment,
            other => EventType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventType::PullRequest => "pull_request",
            EventType::IssueComment => "issue_comment",
            EventType::Unknown(name) => name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: User,
}

impl Repository {
    pub fn repo(&self) -> Repo {
        Repo::new(&self.owner.login, &self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequest,
    pub repository: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub user: User,
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Present only when the issue is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentEvent {
    pub action: String,
    pub issue: Issue,
    pub comment: IssueComment,
    pub repository: Repository,
    pub sender: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_event_types() {
        assert_eq!(EventType::parse("pull_request"), EventType::PullRequest);
        assert_eq!(EventType::parse("issue_comment"), EventType::IssueComment);
        assert_eq!(
            EventType::parse("push"),
            EventType::Unknown("push".to_string())
        );
    }

    #[test]
    fn comment_on_plain_issue_is_not_pull_request() {
        let event: IssueCommentEvent = serde_json::from_str(
            r#"{
                "action": "created",
                "issue": {"number": 3, "title": "bug", "user": {"login": "a"}},
                "comment": {"id": 1, "body": "/run all", "user": {"login": "a"}},
                "repository": {"name": "repo", "owner": {"login": "owner"}},
                "sender": {"login": "a"}
            }"#,
        )
        .unwrap();
        assert!(!event.issue.is_pull_request());
        assert_eq!(event.repository.repo().to_string(), "owner/repo");
    }
}

#[cfg(test)]
pub(crate) fn comment_event(action: &str, body: &str, login: &str, number: u64) -> IssueCommentEvent {
    comment_event_by(action, body, login, login, number)
}

/// A comment written by `author` whose event was triggered by `sender`.
#[cfg(test)]
pub(crate) fn comment_event_by(
    action: &str,
    body: &str,
    author: &str,
    sender: &str,
    number: u64,
) -> IssueCommentEvent {
    serde_json::from_value(serde_json::json!({
        "action": action,
        "issue": {
            "number": number,
            "title": "a pull request",
            "user": {"login": "author"},
            "pull_request": {"url": "https://api.github.com/repos/owner/repo/pulls/1"}
        },
        "comment": {"id": 100, "body": body, "user": {"login": author}},
        "repository": {"name": "repo", "owner": {"login": "owner"}},
        "sender": {"login": sender}
    }))
    .unwrap()
}

#[cfg(test)]
pub(crate) fn pull_request_event(action: &str, pr: &PullRequest) -> PullRequestEvent {
    PullRequestEvent {
        action: action.to_string(),
        number: pr.number,
        pull_request: pr.clone(),
        repository: Repository {
            name: "repo".to_string(),
            owner: User {
                login: "owner".to_string(),
            },
        },
        sender: pr.user.clone(),
    }
}

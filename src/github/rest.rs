use std::time::Duration;

use log::{debug, error};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{
    ChangedFile, Comment, CommitStatus, GitHubClient, PermissionLevel, PullRequest, Repo,
    RepositoryChange, User,
};
use crate::config::GitHubSettings;
use crate::error::{BotError, Result};

const PER_PAGE: usize = 100;

/// Blocking GitHub REST v3 client authenticated with a token.
pub struct RestClient {
    client: Client,
    endpoint: String,
    raw_content_url: String,
    token: String,
}

#[derive(Deserialize)]
struct ReviewResponse {
    user: Option<User>,
}

#[derive(Deserialize)]
struct PermissionResponse {
    permission: PermissionLevel,
}

impl RestClient {
    pub fn new(settings: &GitHubSettings, token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("pr-gate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            raw_content_url: settings.raw_content_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
    }

    /// Turn a non-success answer into a `BotError::GitHub`.
    fn check(operation: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        error!("GitHub API error on {operation}: {status} - {body}");
        Err(BotError::GitHub {
            operation: operation.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    fn get_json<T: DeserializeOwned>(&self, operation: &str, path: &str) -> Result<T> {
        debug!("GET {path}");
        let response = self
            .authorized(self.client.get(self.api_url(path)))
            .send()?;
        Ok(Self::check(operation, response)?.json()?)
    }

    /// Follow `page=` until a short page comes back.
    fn get_paginated<T: DeserializeOwned>(&self, operation: &str, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for page in 1.. {
            let batch: Vec<T> =
                self.get_json(operation, &format!("{path}?per_page={PER_PAGE}&page={page}"))?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }

    fn send_json(
        &self,
        operation: &str,
        request: RequestBuilder,
        body: serde_json::Value,
    ) -> Result<()> {
        let response = self.authorized(request).json(&body).send()?;
        Self::check(operation, response)?;
        Ok(())
    }

    /// GET returning `None` for any non-200 answer.
    fn get_text_if_ok(&self, request: RequestBuilder) -> Result<Option<String>> {
        let response = request.send()?;
        if response.status() != StatusCode::OK {
            debug!("{} answered {}", response.url(), response.status());
            return Ok(None);
        }
        Ok(Some(response.text()?))
    }
}

impl GitHubClient for RestClient {
    fn get_pull_request(&self, repo: &Repo, number: u64) -> Result<PullRequest> {
        self.get_json(
            "get_pull_request",
            &format!("repos/{}/{}/pulls/{number}", repo.owner, repo.name),
        )
    }

    fn list_pull_request_files(&self, repo: &Repo, number: u64) -> Result<Vec<ChangedFile>> {
        self.get_paginated(
            "list_pull_request_files",
            &format!("repos/{}/{}/pulls/{number}/files", repo.owner, repo.name),
        )
    }

    fn list_reviews(&self, repo: &Repo, number: u64) -> Result<Vec<String>> {
        let reviews: Vec<ReviewResponse> = self.get_paginated(
            "list_reviews",
            &format!("repos/{}/{}/pulls/{number}/reviews", repo.owner, repo.name),
        )?;
        Ok(reviews
            .into_iter()
            .filter_map(|r| r.user.map(|u| u.login))
            .collect())
    }

    fn list_issue_comments(&self, repo: &Repo, number: u64) -> Result<Vec<Comment>> {
        self.get_paginated(
            "list_issue_comments",
            &format!("repos/{}/{}/issues/{number}/comments", repo.owner, repo.name),
        )
    }

    fn get_permission_level(&self, repo: &Repo, login: &str) -> Result<PermissionLevel> {
        let url = self.api_url(&format!(
            "repos/{}/{}/collaborators/{login}/permission",
            repo.owner, repo.name
        ));
        let response = self.authorized(self.client.get(url)).send()?;
        // Non-collaborators are answered with 404.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(PermissionLevel::None);
        }
        let permission: PermissionResponse =
            Self::check("get_permission_level", response)?.json()?;
        Ok(permission.permission)
    }

    fn get_file_content(&self, change: &RepositoryChange, path: &str) -> Result<Option<String>> {
        let url = change.raw_file_url(&self.raw_content_url, path);
        let response = self.client.get(url).bearer_auth(&self.token).send()?;
        // Only a missing file falls back to defaults; anything else aborts.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::check("get_file_content", response)?.text()?))
    }

    fn fetch_url(&self, url: &str) -> Result<Option<String>> {
        self.get_text_if_ok(self.client.get(url))
    }

    fn add_labels(&self, repo: &Repo, number: u64, labels: &[String]) -> Result<()> {
        let url = self.api_url(&format!(
            "repos/{}/{}/issues/{number}/labels",
            repo.owner, repo.name
        ));
        self.send_json("add_labels", self.client.post(url), json!({ "labels": labels }))
    }

    fn remove_label(&self, repo: &Repo, number: u64, label: &str) -> Result<()> {
        let mut url = reqwest::Url::parse(&self.api_url(&format!(
            "repos/{}/{}/issues/{number}/labels",
            repo.owner, repo.name
        )))
        .map_err(|e| BotError::Other(format!("invalid label URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| BotError::Other("endpoint cannot carry a path".to_string()))?
            .push(label);
        let response = self.authorized(self.client.delete(url)).send()?;
        Self::check("remove_label", response)?;
        Ok(())
    }

    fn edit_title(&self, repo: &Repo, number: u64, title: &str) -> Result<()> {
        let url = self.api_url(&format!(
            "repos/{}/{}/pulls/{number}",
            repo.owner, repo.name
        ));
        self.send_json("edit_title", self.client.patch(url), json!({ "title": title }))
    }

    fn create_status(&self, change: &RepositoryChange, status: &CommitStatus) -> Result<()> {
        let url = self.api_url(&format!(
            "repos/{}/{}/statuses/{}",
            change.owner, change.repo_name, change.hash
        ));
        self.send_json("create_status", self.client.post(url), json!(status))
    }

    fn create_comment(&self, repo: &Repo, number: u64, body: &str) -> Result<()> {
        let url = self.api_url(&format!(
            "repos/{}/{}/issues/{number}/comments",
            repo.owner, repo.name
        ));
        self.send_json("create_comment", self.client.post(url), json!({ "body": body }))
    }
}

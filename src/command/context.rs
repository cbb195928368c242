use crate::github::{GitHubClient, LazyPullRequest, Repo};

/// What a command rule needs to evaluate permissions and answer on the thread.
pub struct CommandContext<'a> {
    pub client: &'a dyn GitHubClient,
    pub pull_request: &'a LazyPullRequest<'a>,
}

impl<'a> CommandContext<'a> {
    pub fn new(client: &'a dyn GitHubClient, pull_request: &'a LazyPullRequest<'a>) -> Self {
        Self {
            client,
            pull_request,
        }
    }

    pub fn repo(&self) -> &Repo {
        self.pull_request.repo()
    }

    /// Issue/PR number the comment was posted on.
    pub fn number(&self) -> u64 {
        self.pull_request.number()
    }
}

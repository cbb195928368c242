use super::{CommitStatus, GitHubClient, RepositoryChange, StatusState};
use crate::config::BotSettings;
use crate::error::Result;

/// Reports one plugin's commit status for one change.
///
/// The status context is `<bot>/<plugin>`, so each plugin owns exactly one
/// check on the PR and re-reporting overwrites it.
pub struct StatusService<'a> {
    client: &'a dyn GitHubClient,
    change: &'a RepositoryChange,
    context: String,
    details_base: String,
    plugin_name: &'a str,
}

impl<'a> StatusService<'a> {
    pub fn new(
        client: &'a dyn GitHubClient,
        change: &'a RepositoryChange,
        bot: &BotSettings,
        plugin_name: &'a str,
    ) -> Self {
        Self {
            client,
            change,
            context: format!("{}/{}", bot.name, plugin_name),
            details_base: bot.docs_url.trim_end_matches('/').to_string(),
            plugin_name,
        }
    }

    pub fn details_url(&self, page: &str) -> String {
        format!("{}/status/{}/{page}.html", self.details_base, self.plugin_name)
    }

    fn report(&self, state: StatusState, description: &str, page: &str) -> Result<()> {
        let status = CommitStatus {
            state,
            description: description.to_string(),
            context: self.context.clone(),
            target_url: self.details_url(page),
        };
        self.client.create_status(self.change, &status)
    }

    pub fn success(&self, description: &str, page: &str) -> Result<()> {
        self.report(StatusState::Success, description, page)
    }

    pub fn failure(&self, description: &str, page: &str) -> Result<()> {
        self.report(StatusState::Failure, description, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::github::FakeGitHub;

    #[test]
    fn context_and_link_name_the_plugin() {
        let gh = FakeGitHub::new();
        let config = Config::default_config();
        let change = RepositoryChange {
            owner: "o".into(),
            repo_name: "r".into(),
            hash: "abc".into(),
        };
        let service = StatusService::new(&gh, &change, &config.bot, "test-keeper");
        service.failure("No tests", "tk-failure").unwrap();

        let statuses = gh.statuses();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].state, StatusState::Failure);
        assert_eq!(statuses[0].context, format!("{}/test-keeper", config.bot.name));
        assert!(statuses[0].target_url.ends_with("/status/test-keeper/tk-failure.html"));
    }
}

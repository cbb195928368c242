//! Policy plugins and what they share: per-repository configuration and the
//! handler interface the dispatcher drives.

pub mod message;
pub mod test_keeper;
pub mod wip;

pub use test_keeper::TestKeeper;
pub use wip::WorkInProgress;

use log::debug;
use serde::de::DeserializeOwned;

use crate::command::{CommandRule, CommentAction, PermissionCheck};
use crate::config::Config;
use crate::error::{BotError, Result};
use crate::github::{
    GitHubClient, IssueCommentEvent, PullRequestEvent, RepositoryChange, StatusService,
};

/// Directory holding per-repository plugin configuration.
pub const CONFIG_DIR: &str = ".pr-gate";

/// Plugin configuration as read at one commit.
#[derive(Debug, Clone, Default)]
pub struct PluginConfiguration<T> {
    pub config: T,
    /// Browsable URL of the configuration file, when the repository has one.
    pub location: Option<String>,
}

pub fn config_path(plugin_name: &str) -> String {
    format!("{CONFIG_DIR}/{plugin_name}.toml")
}

/// Read `.pr-gate/<plugin>.toml` at the change's commit.
///
/// A missing file yields the defaults. A file that does not parse is an error.
pub fn load_configuration<T: DeserializeOwned + Default>(
    client: &dyn GitHubClient,
    change: &RepositoryChange,
    plugin_name: &str,
) -> Result<PluginConfiguration<T>> {
    let path = config_path(plugin_name);
    let Some(content) = client.get_file_content(change, &path)? else {
        debug!("no {path} in {}@{}, using defaults", change.repo(), change.hash);
        return Ok(PluginConfiguration::default());
    };
    let location = change.blob_url(&path);
    let config = toml::from_str(&content).map_err(|source| BotError::Config {
        location: location.clone(),
        source,
    })?;
    Ok(PluginConfiguration {
        config,
        location: Some(location),
    })
}

/// `/run <plugin>` and `/run all`, open to admins, the PR creator and reviewers.
///
/// `/run all` is quiet: every plugin registers it, and one denial comment per
/// plugin would be noise.
pub(crate) fn run_command_rules<'a, F>(plugin_name: &str, effect: F) -> [CommandRule<'a>; 2]
where
    F: Fn() -> Result<()> + Clone + 'a,
{
    let allowed = || {
        vec![PermissionCheck::AnyOf(vec![
            PermissionCheck::Admin,
            PermissionCheck::PullRequestCreator,
            PermissionCheck::Reviewer,
        ])]
    };
    [
        CommandRule::register(&format!("/run {plugin_name}"), false)
            .when(&[CommentAction::Triggered])
            .by(allowed())
            .then_do(effect.clone()),
        CommandRule::register("/run all", true)
            .when(&[CommentAction::Triggered])
            .by(allowed())
            .then_do(effect),
    ]
}

/// Everything a plugin needs from the process: the GitHub client and settings.
#[derive(Clone, Copy)]
pub struct BotContext<'a> {
    pub client: &'a dyn GitHubClient,
    pub config: &'a Config,
}

impl<'a> BotContext<'a> {
    pub fn new(client: &'a dyn GitHubClient, config: &'a Config) -> Self {
        Self { client, config }
    }

    pub fn status<'s>(
        &self,
        change: &'s RepositoryChange,
        plugin_name: &'s str,
    ) -> StatusService<'s>
    where
        'a: 's,
    {
        StatusService::new(self.client, change, &self.config.bot, plugin_name)
    }
}

/// A plugin as seen by the dispatcher.
///
/// Each handler filters the actions it cares about; unlisted actions are
/// silently ignored.
pub trait EventHandler {
    fn name(&self) -> &'static str;

    fn handle_pull_request(&self, event: &PullRequestEvent) -> Result<()>;

    /// Only called for comments on pull requests.
    fn handle_comment(&self, event: &IssueCommentEvent) -> Result<()>;
}

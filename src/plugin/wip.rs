//! Work-in-progress plugin: keeps a PR's WIP label, title prefix and commit
//! status consistent.
//!
//! The state is never stored. Every event recomputes it from the title, the
//! labels and the action that triggered the event.

use log::{error, info};
use regex::Regex;
use serde::Deserialize;

use super::{BotContext, EventHandler, PluginConfiguration, load_configuration, run_command_rules};
use crate::command::{CommandContext, CommandRegistry};
use crate::config::merge_list;
use crate::error::{BotError, Result};
use crate::github::{
    IssueCommentEvent, LazyPullRequest, PullRequest, PullRequestEvent, Repo, RepositoryChange,
};

pub const PLUGIN_NAME: &str = "work-in-progress";
pub const DEFAULT_LABEL: &str = "work-in-progress";
pub const DEFAULT_PREFIXES: &[&str] = &["WIP", "DO NOT MERGE", "DON'T MERGE", "WORK-IN-PROGRESS"];

pub const IN_PROGRESS_MESSAGE: &str =
    "PR is in progress and can't be merged yet. You might want to wait with review as well";
pub const IN_PROGRESS_PAGE: &str = "wip-failed";
pub const READY_MESSAGE: &str = "PR is ready for review and merge";
pub const READY_PAGE: &str = "wip-success";

const HANDLED_PR_ACTIONS: &[&str] = &[
    "opened",
    "reopened",
    "edited",
    "synchronize",
    "labeled",
    "unlabeled",
];
const HANDLED_COMMENT_ACTIONS: &[&str] = &["created"];

/// `.pr-gate/work-in-progress.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WipConfig {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub prefix: Vec<String>,
    /// Add `prefix` to the defaults instead of replacing them.
    #[serde(default)]
    pub combine: bool,
}

impl WipConfig {
    pub fn label(&self) -> &str {
        self.label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LABEL)
    }

    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect();
        let configured: Vec<String> = self
            .prefix
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if !configured.is_empty() {
            merge_list(&mut prefixes, configured, &[], !self.combine);
        }
        prefixes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Labeled,
    Unlabeled,
    /// Anything that may have changed the title: open, reopen, edit, push.
    TitleChanged,
}

impl Trigger {
    pub fn from_action(action: &str) -> Self {
        match action {
            "labeled" => Trigger::Labeled,
            "unlabeled" => Trigger::Unlabeled,
            _ => Trigger::TitleChanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipState {
    InProgress,
    ReadyForReview,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    AddLabel,
    RemoveLabel,
    EditTitle(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: WipState,
    pub effect: Option<SideEffect>,
}

impl Transition {
    fn to(state: WipState) -> Self {
        Self {
            state,
            effect: None,
        }
    }

    fn with(state: WipState, effect: SideEffect) -> Self {
        Self {
            state,
            effect: Some(effect),
        }
    }
}

/// Compiled label and title prefixes for one repository.
#[derive(Debug, Clone)]
pub struct WipPolicy {
    label: String,
    prefixes: Vec<Regex>,
}

impl WipPolicy {
    pub fn from_config(config: &WipConfig) -> Result<Self> {
        let prefixes = config
            .prefixes()
            .iter()
            .map(|prefix| {
                let pattern = format!(r"(?i)^(\[|\()?{}(\]|\))?(:|\s)+", regex::escape(prefix));
                Regex::new(&pattern).map_err(|source| BotError::Pattern { pattern, source })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            label: config.label().to_string(),
            prefixes,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The WIP prefix at the start of `title`, including brackets and the
    /// separator that follows it.
    pub fn find_prefix<'t>(&self, title: &'t str) -> Option<&'t str> {
        self.prefixes
            .iter()
            .find_map(|re| re.find(title))
            .map(|m| m.as_str())
    }

    pub fn has_prefix(&self, title: &str) -> bool {
        self.find_prefix(title).is_some()
    }

    pub fn evaluate(&self, trigger: Trigger, title: &str, has_label: bool) -> Transition {
        use WipState::*;

        match trigger {
            Trigger::Labeled if has_label => Transition::to(InProgress),
            Trigger::Labeled => Transition::to(ReadyForReview),
            Trigger::Unlabeled if has_label => Transition::to(InProgress),
            Trigger::Unlabeled => match self.find_prefix(title) {
                Some(prefix) if title.len() > prefix.len() => Transition::with(
                    ReadyForReview,
                    SideEffect::EditTitle(title[prefix.len()..].to_string()),
                ),
                _ => Transition::to(ReadyForReview),
            },
            Trigger::TitleChanged => match (self.has_prefix(title), has_label) {
                (true, false) => Transition::with(InProgress, SideEffect::AddLabel),
                (true, true) => Transition::to(InProgress),
                (false, true) => Transition::with(ReadyForReview, SideEffect::RemoveLabel),
                (false, false) => Transition::to(ReadyForReview),
            },
        }
    }
}

pub struct WorkInProgress<'a> {
    ctx: BotContext<'a>,
}

impl<'a> WorkInProgress<'a> {
    pub fn new(ctx: BotContext<'a>) -> Self {
        Self { ctx }
    }

    /// Recompute the state of `pr`, apply the side effect and report status.
    ///
    /// A failed side effect is logged; the status is reported regardless.
    pub fn reconcile(&self, repo: &Repo, pr: &PullRequest, trigger: Trigger) -> Result<()> {
        let change = RepositoryChange::for_pull_request(repo, pr);
        let loaded: PluginConfiguration<WipConfig> =
            load_configuration(self.ctx.client, &change, PLUGIN_NAME)?;
        let policy = WipPolicy::from_config(&loaded.config)?;

        let transition = policy.evaluate(trigger, &pr.title, pr.has_label(policy.label()));
        if let Some(effect) = &transition.effect
            && let Err(e) = self.apply(repo, pr.number, &policy, effect)
        {
            error!("{PLUGIN_NAME}: {effect:?} failed on {repo}#{}: {e}", pr.number);
        }

        let status = self.ctx.status(&change, PLUGIN_NAME);
        match transition.state {
            WipState::InProgress => status.failure(IN_PROGRESS_MESSAGE, IN_PROGRESS_PAGE),
            WipState::ReadyForReview => status.success(READY_MESSAGE, READY_PAGE),
        }
    }

    fn apply(&self, repo: &Repo, number: u64, policy: &WipPolicy, effect: &SideEffect) -> Result<()> {
        let client = self.ctx.client;
        match effect {
            SideEffect::AddLabel => client.add_labels(repo, number, &[policy.label().to_string()]),
            SideEffect::RemoveLabel => client.remove_label(repo, number, policy.label()),
            SideEffect::EditTitle(title) => {
                info!("{PLUGIN_NAME}: stripping WIP prefix of {repo}#{number}");
                client.edit_title(repo, number, title)
            }
        }
    }
}

impl EventHandler for WorkInProgress<'_> {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn handle_pull_request(&self, event: &PullRequestEvent) -> Result<()> {
        if !HANDLED_PR_ACTIONS.contains(&event.action.as_str()) {
            return Ok(());
        }
        self.reconcile(
            &event.repository.repo(),
            &event.pull_request,
            Trigger::from_action(&event.action),
        )
    }

    fn handle_comment(&self, event: &IssueCommentEvent) -> Result<()> {
        if !HANDLED_COMMENT_ACTIONS.contains(&event.action.as_str()) {
            return Ok(());
        }
        let repo = event.repository.repo();
        let pr = LazyPullRequest::new(self.ctx.client, repo.clone(), event.issue.number);

        let recheck = || self.reconcile(&repo, pr.load()?, Trigger::TitleChanged);
        let mut registry = CommandRegistry::new();
        for rule in run_command_rules(PLUGIN_NAME, recheck) {
            registry.add(rule);
        }
        registry.execute(event, &CommandContext::new(self.ctx.client, &pr))
    }
}

//! Test-keeper plugin: fails a PR's status when its changeset carries no tests.

use log::{error, info};
use serde::Deserialize;

use super::message::{HINT_MARKER, SKIP_COMMAND, hint_message};
use super::{BotContext, EventHandler, PluginConfiguration, load_configuration, run_command_rules};
use crate::command::{
    CommandContext, CommandRegistry, CommandRule, CommentAction, PermissionCheck, all_of,
};
use crate::error::Result;
use crate::github::{
    Comment, IssueCommentEvent, LazyPullRequest, PullRequestEvent, RepositoryChange,
};
use crate::pattern::{FileCategories, FileMatcher, PatternSource};

pub const PLUGIN_NAME: &str = "test-keeper";

pub const TESTS_EXIST_MESSAGE: &str = "There are some tests :)";
pub const TESTS_EXIST_PAGE: &str = "tk-success";
pub const ONLY_SKIPPED_MESSAGE: &str = "Only files excluded from the test check were changed";
pub const ONLY_SKIPPED_PAGE: &str = "tk-skipped";
pub const NO_TESTS_MESSAGE: &str = "No tests in this PR :(";
pub const NO_TESTS_PAGE: &str = "tk-failure";
pub const APPROVED_PAGE: &str = "tk-okwithouttests";

const HANDLED_PR_ACTIONS: &[&str] = &["opened", "reopened", "synchronize"];
const HANDLED_COMMENT_ACTIONS: &[&str] = &["created", "edited", "deleted"];

pub fn approved_message(login: &str) -> String {
    format!("PR was approved without tests by @{login}")
}

/// `.pr-gate/test-keeper.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestKeeperConfig {
    #[serde(default)]
    pub inclusion: Option<PatternSource>,
    #[serde(default)]
    pub exclusion: Option<PatternSource>,
    /// Add the configured patterns to the defaults instead of replacing them.
    #[serde(default)]
    pub combine: bool,
    /// Path or URL of a custom hint message.
    #[serde(default, alias = "pluginHint")]
    pub plugin_hint: Option<String>,
}

impl TestKeeperConfig {
    pub fn matcher(&self) -> Result<FileMatcher> {
        FileMatcher::from_sources(self.inclusion.as_ref(), self.exclusion.as_ref(), self.combine)
    }
}

/// Who may approve a PR without tests.
fn approvers() -> Vec<PermissionCheck> {
    vec![PermissionCheck::AnyOf(vec![
        PermissionCheck::Admin,
        PermissionCheck::Reviewer,
    ])]
}

pub struct TestKeeper<'a> {
    ctx: BotContext<'a>,
}

impl<'a> TestKeeper<'a> {
    pub fn new(ctx: BotContext<'a>) -> Self {
        Self { ctx }
    }

    /// Decide the PR's status: approved without tests, tests found, only
    /// skipped files, or no tests. The last one also posts the hint comment.
    pub fn check_tests(&self, pull_request: &LazyPullRequest) -> Result<()> {
        let client = self.ctx.client;
        let pr = pull_request.load()?;
        let repo = pull_request.repo();
        let change = RepositoryChange::for_pull_request(repo, pr);
        let loaded: PluginConfiguration<TestKeeperConfig> =
            load_configuration(client, &change, PLUGIN_NAME)?;
        let status = self.ctx.status(&change, PLUGIN_NAME);

        let comments = client.list_issue_comments(repo, pr.number)?;
        if let Some(login) = self.find_approval(&comments, pull_request)? {
            return status.success(&approved_message(&login), APPROVED_PAGE);
        }

        let files = client.list_pull_request_files(repo, pr.number)?;
        let categories = FileCategories::count(&files, &loaded.config.matcher()?);
        info!("{PLUGIN_NAME}: {repo}#{} {categories:?}", pr.number);

        if categories.tests_exist() {
            return status.success(TESTS_EXIST_MESSAGE, TESTS_EXIST_PAGE);
        }
        if categories.only_skipped_files() {
            return status.success(ONLY_SKIPPED_MESSAGE, ONLY_SKIPPED_PAGE);
        }

        status.failure(NO_TESTS_MESSAGE, NO_TESTS_PAGE)?;
        if let Err(e) = self.post_hint(&comments, &change, &loaded, pr.number) {
            error!("{PLUGIN_NAME}: posting hint on {repo}#{} failed: {e}", pr.number);
        }
        Ok(())
    }

    /// Author of the first `/ok-without-tests` comment who may approve.
    fn find_approval(
        &self,
        comments: &[Comment],
        pull_request: &LazyPullRequest,
    ) -> Result<Option<String>> {
        let ctx = CommandContext::new(self.ctx.client, pull_request);
        for comment in comments.iter().filter(|c| c.body.trim() == SKIP_COMMAND) {
            if all_of(&approvers(), &comment.user.login, &ctx)?.user_is_approved {
                return Ok(Some(comment.user.login.clone()));
            }
        }
        Ok(None)
    }

    /// Post the hint unless an earlier run already did.
    fn post_hint(
        &self,
        comments: &[Comment],
        change: &RepositoryChange,
        loaded: &PluginConfiguration<TestKeeperConfig>,
        number: u64,
    ) -> Result<()> {
        if comments.iter().any(|c| c.body.contains(HINT_MARKER)) {
            return Ok(());
        }
        let message = hint_message(
            self.ctx.client,
            self.ctx.config,
            change,
            loaded.location.as_deref(),
            loaded.config.plugin_hint.as_deref(),
        );
        self.ctx
            .client
            .create_comment(&change.repo(), number, &format!("{message}\n\n{HINT_MARKER}"))
    }

    fn approve(&self, pull_request: &LazyPullRequest, login: &str) -> Result<()> {
        let change = RepositoryChange::for_pull_request(pull_request.repo(), pull_request.load()?);
        self.ctx
            .status(&change, PLUGIN_NAME)
            .success(&approved_message(login), APPROVED_PAGE)
    }
}

impl EventHandler for TestKeeper<'_> {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn handle_pull_request(&self, event: &PullRequestEvent) -> Result<()> {
        if !HANDLED_PR_ACTIONS.contains(&event.action.as_str()) {
            return Ok(());
        }
        let pr = LazyPullRequest::ready(
            self.ctx.client,
            event.repository.repo(),
            event.pull_request.clone(),
        );
        self.check_tests(&pr)
    }

    fn handle_comment(&self, event: &IssueCommentEvent) -> Result<()> {
        if !HANDLED_COMMENT_ACTIONS.contains(&event.action.as_str()) {
            return Ok(());
        }
        let pr = LazyPullRequest::new(
            self.ctx.client,
            event.repository.repo(),
            event.issue.number,
        );
        let login = event.sender.login.as_str();
        let check = || self.check_tests(&pr);

        let mut registry = CommandRegistry::new();
        registry.add(
            CommandRule::register(SKIP_COMMAND, false)
                .when(&[CommentAction::Triggered])
                .by(approvers())
                .then_do(|| self.approve(&pr, login))
                .when(&[CommentAction::Deleted])
                .by(approvers())
                .then_do(check),
        );
        for rule in run_command_rules(PLUGIN_NAME, check) {
            registry.add(rule);
        }
        registry.execute(event, &CommandContext::new(self.ctx.client, &pr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::BotError;
    use crate::github::event::{comment_event, comment_event_by, pull_request_event};
    use crate::github::{CommitStatus, FakeGitHub, PermissionLevel, PullRequest, Repo, StatusState};

    fn repo() -> Repo {
        Repo::new("owner", "repo")
    }

    fn setup(files: &[&str]) -> (FakeGitHub, PullRequest) {
        let gh = FakeGitHub::new();
        let pr = FakeGitHub::pull_request(1, "Add feature", "author");
        gh.add_pull_request(&repo(), pr.clone());
        gh.set_files(&repo(), 1, files);
        gh.set_permission(&repo(), "boss", PermissionLevel::Admin);
        gh.add_review(&repo(), 1, "reviewer");
        (gh, pr)
    }

    fn last_status(gh: &FakeGitHub) -> CommitStatus {
        gh.statuses().pop().expect("a status was reported")
    }

    fn on_pr(gh: &FakeGitHub, pr: &PullRequest, action: &str) -> Result<()> {
        let config = Config::default_config();
        TestKeeper::new(BotContext::new(gh, &config)).handle_pull_request(&pull_request_event(action, pr))
    }

    fn on_comment(gh: &FakeGitHub, action: &str, body: &str, login: &str) -> Result<()> {
        let config = Config::default_config();
        TestKeeper::new(BotContext::new(gh, &config)).handle_comment(&comment_event(action, body, login, 1))
    }

    #[test]
    fn config_accepts_both_pattern_forms() {
        let config: TestKeeperConfig = toml::from_str(
            r#"
            inclusion = '_spec\.rb$'
            exclusion = ['docs/', 'regex{{\.svg$}}']
            combine = true
            pluginHint = "docs/no-tests.md"
        "#,
        )
        .unwrap();
        assert_eq!(config.inclusion, Some(PatternSource::Regexp(r"_spec\.rb$".into())));
        assert!(matches!(config.exclusion, Some(PatternSource::Patterns(ref p)) if p.len() == 2));
        assert_eq!(config.plugin_hint.as_deref(), Some("docs/no-tests.md"));
        let matcher = config.matcher().unwrap();
        assert!(matcher.matches_inclusion("spec/models/user_spec.rb"));
        assert!(matcher.matches_exclusion("logo.svg"));
        assert!(matcher.matches_exclusion("pom.xml"));
    }

    #[test]
    fn tests_present() {
        let (gh, pr) = setup(&["src/Foo.java", "src/test/FooTest.java"]);
        on_pr(&gh, &pr, "opened").unwrap();
        let status = last_status(&gh);
        assert_eq!(status.state, StatusState::Success);
        assert_eq!(status.description, TESTS_EXIST_MESSAGE);
        assert_eq!(status.context, "pr-gate/test-keeper");
        assert!(gh.posted_comments().is_empty());
    }

    #[test]
    fn only_skipped_files() {
        let (gh, pr) = setup(&["README.md", "pom.xml"]);
        on_pr(&gh, &pr, "synchronize").unwrap();
        let status = last_status(&gh);
        assert_eq!(status.state, StatusState::Success);
        assert_eq!(status.description, ONLY_SKIPPED_MESSAGE);
        assert!(status.target_url.ends_with("/tk-skipped.html"));
    }

    #[test]
    fn no_tests_fails_and_hints_once() {
        let (gh, pr) = setup(&["src/Foo.java"]);
        on_pr(&gh, &pr, "opened").unwrap();
        assert_eq!(last_status(&gh).state, StatusState::Failure);
        assert_eq!(last_status(&gh).description, NO_TESTS_MESSAGE);

        on_pr(&gh, &pr, "synchronize").unwrap();
        let comments = gh.posted_comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].contains(SKIP_COMMAND));
        assert!(comments[0].ends_with(HINT_MARKER));
    }

    #[test]
    fn failed_hint_keeps_failure_status() {
        let (gh, pr) = setup(&["src/Foo.java"]);
        gh.fail_on("create_comment");
        on_pr(&gh, &pr, "opened").unwrap();
        assert_eq!(last_status(&gh).state, StatusState::Failure);
    }

    #[test]
    fn custom_hint_from_repository() {
        let (gh, pr) = setup(&["src/Foo.java"]);
        let change = RepositoryChange::for_pull_request(&repo(), &pr);
        gh.add_file_content(&change, ".pr-gate/test-keeper.toml", "plugin_hint = \"docs/hint.md\"");
        gh.add_url(
            "https://raw.githubusercontent.com/owner/repo/sha-1/docs/hint.md",
            "Please add tests!",
        );
        on_pr(&gh, &pr, "opened").unwrap();
        assert_eq!(gh.posted_comments()[0], format!("Please add tests!\n\n{HINT_MARKER}"));
    }

    #[test]
    fn repository_patterns_apply() {
        let (gh, pr) = setup(&["lib/user.rb", "spec/user_spec.rb"]);
        let change = RepositoryChange::for_pull_request(&repo(), &pr);
        gh.add_file_content(&change, ".pr-gate/test-keeper.toml", r#"inclusion = '_spec\.rb$'"#);
        on_pr(&gh, &pr, "opened").unwrap();
        assert_eq!(last_status(&gh).description, TESTS_EXIST_MESSAGE);
    }

    #[test]
    fn broken_pattern_aborts() {
        let (gh, pr) = setup(&["src/Foo.java"]);
        let change = RepositoryChange::for_pull_request(&repo(), &pr);
        gh.add_file_content(&change, ".pr-gate/test-keeper.toml", r#"inclusion = '(unclosed'"#);
        let err = on_pr(&gh, &pr, "opened").unwrap_err();
        assert!(matches!(err, BotError::Pattern { .. }));
        assert!(gh.statuses().is_empty());
    }

    #[test]
    fn config_fetch_failure_aborts_without_status() {
        let (gh, pr) = setup(&["src/Foo.java"]);
        gh.fail_on("get_file_content");
        let err = on_pr(&gh, &pr, "opened").unwrap_err();
        assert!(matches!(err, BotError::GitHub { .. }));
        assert!(gh.mutations().is_empty());
        assert_eq!(gh.call_count("list_pull_request_files"), 0);
    }

    #[test]
    fn earlier_approval_by_admin_wins() {
        let (gh, pr) = setup(&["src/Foo.java"]);
        gh.add_comment(&repo(), 1, "author", SKIP_COMMAND);
        gh.add_comment(&repo(), 1, "boss", SKIP_COMMAND);
        on_pr(&gh, &pr, "synchronize").unwrap();
        let status = last_status(&gh);
        assert_eq!(status.state, StatusState::Success);
        assert_eq!(status.description, "PR was approved without tests by @boss");
        assert_eq!(gh.call_count("list_pull_request_files"), 0);
    }

    #[test]
    fn closed_pr_is_ignored() {
        let (gh, pr) = setup(&["src/Foo.java"]);
        on_pr(&gh, &pr, "closed").unwrap();
        assert!(gh.mutations().is_empty());
    }

    #[test]
    fn reviewer_approves_by_comment() {
        let (gh, _) = setup(&["src/Foo.java"]);
        on_comment(&gh, "created", SKIP_COMMAND, "reviewer").unwrap();
        let status = last_status(&gh);
        assert_eq!(status.description, approved_message("reviewer"));
        assert!(status.target_url.ends_with("/tk-okwithouttests.html"));
    }

    #[test]
    fn creator_cannot_approve() {
        let (gh, _) = setup(&["src/Foo.java"]);
        on_comment(&gh, "created", SKIP_COMMAND, "author").unwrap();
        assert!(gh.statuses().is_empty());
        assert_eq!(
            gh.posted_comments(),
            vec![
                "Hey @author! The `/ok-without-tests` command you used was not executed because \
                 you are not an admin of this repository and you are not a reviewer of this pull request."
                    .to_string()
            ]
        );
    }

    #[test]
    fn deleted_approval_rechecks() {
        let (gh, _) = setup(&["src/Foo.java"]);
        on_comment(&gh, "deleted", SKIP_COMMAND, "boss").unwrap();
        assert_eq!(last_status(&gh).description, NO_TESTS_MESSAGE);
    }

    #[test]
    fn admin_deleting_someone_elses_approval_rechecks() {
        let (gh, _) = setup(&["src/Foo.java"]);
        gh.set_permission(&repo(), "drive-by", PermissionLevel::Read);
        let config = Config::default_config();
        let event = comment_event_by("deleted", SKIP_COMMAND, "drive-by", "boss", 1);
        TestKeeper::new(BotContext::new(&gh, &config)).handle_comment(&event).unwrap();

        assert_eq!(last_status(&gh).description, NO_TESTS_MESSAGE);
        assert_eq!(gh.posted_comments().len(), 1);
        assert!(gh.posted_comments()[0].ends_with(HINT_MARKER));
    }

    #[test]
    fn edited_approval_is_credited_to_the_editor() {
        let (gh, _) = setup(&["src/Foo.java"]);
        let config = Config::default_config();
        let event = comment_event_by("edited", SKIP_COMMAND, "author", "reviewer", 1);
        TestKeeper::new(BotContext::new(&gh, &config)).handle_comment(&event).unwrap();

        assert_eq!(last_status(&gh).description, approved_message("reviewer"));
        assert!(gh.posted_comments().is_empty());
    }

    #[test]
    fn run_command_rechecks() {
        let (gh, _) = setup(&["src/Foo.java", "src/FooTest.java"]);
        on_comment(&gh, "created", "/run test-keeper", "author").unwrap();
        assert_eq!(last_status(&gh).description, TESTS_EXIST_MESSAGE);
    }

    #[test]
    fn plain_comment_does_nothing() {
        let (gh, _) = setup(&["src/Foo.java"]);
        on_comment(&gh, "created", "nice work", "boss").unwrap();
        assert!(gh.mutations().is_empty());
        assert_eq!(gh.call_count("get_pull_request"), 0);
    }
}

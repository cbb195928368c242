//! Hint comments: a repository-provided message or the built-in one.

use log::warn;

use crate::config::Config;
use crate::github::{GitHubClient, RepositoryChange};

/// Command that approves a pull request without tests.
pub const SKIP_COMMAND: &str = "/ok-without-tests";

/// Hidden marker identifying the bot's hint comment on a thread.
pub const HINT_MARKER: &str = "<!-- pr-gate:test-keeper:hint -->";

/// Where a `plugin_hint` value points to.
///
/// Absolute URLs are used as is; anything else is a path in the repository,
/// resolved at the change's commit on the raw-content host.
pub fn hint_url(hint: &str, change: &RepositoryChange, raw_content_url: &str) -> String {
    let hint = hint.trim();
    match reqwest::Url::parse(hint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => hint.to_string(),
        _ => change.raw_file_url(raw_content_url, hint),
    }
}

/// Body of the hint comment posted when a pull request has no tests.
///
/// `config_location` is the browsable URL of the repository's configuration
/// file, if it has one.
pub fn hint_message(
    client: &dyn GitHubClient,
    config: &Config,
    change: &RepositoryChange,
    config_location: Option<&str>,
    plugin_hint: Option<&str>,
) -> String {
    let Some(hint) = plugin_hint.filter(|h| !h.trim().is_empty()) else {
        return default_message(config, config_location);
    };

    let url = hint_url(hint, change, &config.github.raw_content_url);
    match client.fetch_url(&url) {
        Ok(Some(body)) => body,
        Ok(None) => not_found_message(config, config_location, &url),
        Err(e) => {
            warn!("fetching custom message {url} failed: {e}");
            not_found_message(config, config_location, &url)
        }
    }
}

pub fn default_message(config: &Config, config_location: Option<&str>) -> String {
    let more = match config_location {
        Some(location) => format!(
            "The rules for what counts as a test are defined in the [configuration file]({location})."
        ),
        None => format!(
            "Have a look at the [documentation]({}#test-keeper) to learn how to configure what counts as a test.",
            config.bot.docs_url.trim_end_matches('/')
        ),
    };
    format!(
        "It appears that no tests have been added or updated in this PR.\n\n\
         Automated tests give us confidence in shipping reliable software. \
         Please add some as part of this change.\n\n\
         If you are an admin or a reviewer of this PR and you are sure that no test is needed, \
         comment `{SKIP_COMMAND}` to make the status green.\n\n\
         {more}"
    )
}

fn not_found_message(config: &Config, config_location: Option<&str>, url: &str) -> String {
    format!(
        "{}\n\nNote: the custom message configured for this repository could not be loaded from `{url}`.",
        default_message(config, config_location)
    )
}

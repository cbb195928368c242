//! pr-gate: ChatOps bots that gate GitHub pull requests.
//!
//! Two plugins react to `pull_request` and `issue_comment` webhooks and report
//! a commit status: **work-in-progress** keeps a PR's WIP label and title
//! prefix in sync, **test-keeper** fails PRs whose changeset carries no tests.
//! Both accept chat commands (`/run all`, `/ok-without-tests`) gated by
//! permission checks.
//!
//! # Architecture
//!
//! - **[`dispatch`]**: decodes a delivery and hands it to every enabled plugin.
//! - **[`plugin`]**: the two plugins, per-repository configuration, hint messages.
//! - **[`command`]**: command rules, permission checks, denial comments.
//! - **[`pattern`]**: glob and `regex{{...}}` file patterns, changeset tallies.
//! - **[`github`]**: data model, webhook events, REST/dry-run/fake clients.
//! - **[`config`]**: embedded defaults + user overlay merge.
//! - **[`logging`]**: stderr and file logging via `simplelog`.

/// Command rules, permission evaluation and dispatch of chat commands.
pub mod command;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Event routing to the enabled plugins.
pub mod dispatch;
/// Crate error type.
pub mod error;
/// GitHub collaborator: model, events, clients.
pub mod github;
/// Logger setup.
pub mod logging;
/// File pattern compilation and changeset classification.
pub mod pattern;
/// Work-in-progress and test-keeper plugins.
pub mod plugin;

use config::Config;
use error::Result;
use github::{EventType, GitHubClient};

/// Dispatch one delivery with the given client and configuration.
///
/// This is the main entry point for tests and embedding; the binary adds
/// payload reading, token resolution and dry-run reporting around it.
pub fn handle_event(
    client: &dyn GitHubClient,
    config: &Config,
    event_type: &str,
    payload: &str,
) -> Result<()> {
    dispatch::EventDispatcher::new(client, config).dispatch(&EventType::parse(event_type), payload)
}

//! Routes one webhook delivery to every enabled plugin.

use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::{BotError, Result};
use crate::github::{EventType, GitHubClient, IssueCommentEvent, PullRequestEvent};
use crate::plugin::{BotContext, EventHandler, TestKeeper, WorkInProgress, test_keeper, wip};

/// Build the handler for a configured plugin name.
pub fn handler_for<'a>(name: &str, ctx: BotContext<'a>) -> Option<Box<dyn EventHandler + 'a>> {
    match name {
        wip::PLUGIN_NAME => Some(Box::new(WorkInProgress::new(ctx))),
        test_keeper::PLUGIN_NAME => Some(Box::new(TestKeeper::new(ctx))),
        _ => None,
    }
}

pub struct EventDispatcher<'a> {
    handlers: Vec<Box<dyn EventHandler + 'a>>,
}

impl<'a> EventDispatcher<'a> {
    /// Handlers for `config.bot.plugins`, in configuration order.
    pub fn new(client: &'a dyn GitHubClient, config: &'a Config) -> Self {
        let ctx = BotContext::new(client, config);
        let mut handlers = Vec::new();
        for name in &config.bot.plugins {
            match handler_for(name, ctx) {
                Some(handler) => handlers.push(handler),
                None => warn!("unknown plugin {name:?} in configuration, skipping"),
            }
        }
        Self { handlers }
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Decode `payload` as `event_type` and hand it to every plugin.
    ///
    /// Unknown event types and comments on plain issues are ignored. A handler
    /// failure does not stop the others; the first error is returned.
    pub fn dispatch(&self, event_type: &EventType, payload: &str) -> Result<()> {
        match event_type {
            EventType::PullRequest => {
                let event: PullRequestEvent = decode(event_type, payload)?;
                info!(
                    "pull_request {} on {}#{}",
                    event.action,
                    event.repository.repo(),
                    event.number
                );
                self.run_all(|h| h.handle_pull_request(&event))
            }
            EventType::IssueComment => {
                let event: IssueCommentEvent = decode(event_type, payload)?;
                if !event.issue.is_pull_request() {
                    debug!(
                        "ignoring comment on issue {}#{}",
                        event.repository.repo(),
                        event.issue.number
                    );
                    return Ok(());
                }
                info!(
                    "issue_comment {} by {} on {}#{}",
                    event.action,
                    event.sender.login,
                    event.repository.repo(),
                    event.issue.number
                );
                self.run_all(|h| h.handle_comment(&event))
            }
            EventType::Unknown(name) => {
                warn!("received an event of type {name:?} but no plugin handles it");
                Ok(())
            }
        }
    }

    fn run_all(&self, handle: impl Fn(&dyn EventHandler) -> Result<()>) -> Result<()> {
        let mut first_error = None;
        for handler in &self.handlers {
            if let Err(e) = handle(handler.as_ref()) {
                error!("{}: {e}", handler.name());
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

fn decode<T: DeserializeOwned>(event_type: &EventType, payload: &str) -> Result<T> {
    serde_json::from_str(payload).map_err(|source| {
        error!(
            "failed to parse {} payload: {source}; payload: {payload}",
            event_type.as_str()
        );
        BotError::Payload {
            event: event_type.as_str().to_string(),
            source,
        }
    })
}

//! Error types for event handling.
//!
//! A permission denial is not an error: it is reported through
//! [`PermissionCheckResult`](crate::command::PermissionCheckResult) and
//! surfaced to users as a comment. Everything here aborts the current event.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    /// Webhook payload did not decode into the declared event type.
    #[error("failed to parse {event} payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    /// A configuration file exists but does not parse.
    #[error("invalid configuration in {location}: {source}")]
    Config {
        location: String,
        #[source]
        source: toml::de::Error,
    },

    /// A `regex{{...}}` or raw regexp pattern does not compile.
    #[error("invalid file pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// GitHub answered with a non-success status.
    #[error("GitHub API error on {operation}: {status} - {body}")]
    GitHub {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = BotError> = std::result::Result<T, E>;

//! pr-gate: handles one GitHub webhook delivery.
//!
//! Reads the event payload from a file or stdin, runs the enabled plugins
//! against it and exits non-zero when handling failed. With `--dry-run` the
//! bot still reads from GitHub but prints the mutations it would have made as
//! JSON on stdout instead of applying them.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{LevelFilter, error};

use pr_gate::config::Config;
use pr_gate::error::{BotError, Result};
use pr_gate::github::{DryRunClient, RestClient};

#[derive(Parser)]
#[command(name = "pr-gate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Work-in-progress and test-keeper checks for GitHub pull requests", long_about = None)]
struct Cli {
    /// Webhook event type (pull_request, issue_comment)
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    event: String,

    /// File holding the webhook payload (default: stdin)
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    payload: Option<PathBuf>,

    /// Configuration overlay (default: ~/.config/pr-gate/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read from GitHub but only print the mutations
    #[arg(long)]
    dry_run: bool,

    /// Override the configured log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<LevelFilter>,
}

fn read_payload(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.github.dry_run = true;
    }
    pr_gate::logging::init(&config.logging, cli.log_level);

    let payload = read_payload(cli.payload.as_deref())?;
    let client = RestClient::new(&config.github, config.github.resolve_token()?)?;

    if !config.github.dry_run {
        return pr_gate::handle_event(&client, &config, &cli.event, &payload);
    }

    let client = DryRunClient::new(client);
    let result = pr_gate::handle_event(&client, &config, &cli.event, &payload);
    let mutations = client.into_mutations();
    let json = serde_json::to_string_pretty(&mutations)
        .map_err(|e| BotError::Other(format!("cannot print mutations: {e}")))?;
    println!("{json}");
    result
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Configuration errors surface before the logger exists.
            if log::log_enabled!(log::Level::Error) {
                error!("{e}");
            } else {
                eprintln!("pr-gate: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

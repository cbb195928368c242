use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotSettings,
    #[serde(default)]
    pub github: GitHubSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct BotSettings {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub docs_url: String,
    /// Plugins the dispatcher routes events to.
    #[serde(default)]
    pub plugins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct GitHubSettings {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub raw_content_url: String,
    #[serde(default)]
    pub token_file: String,
    #[serde(default)]
    pub timeout_secs: u64,
    /// Read from GitHub but only record mutations.
    #[serde(default)]
    pub dry_run: bool,
}

impl GitHubSettings {
    pub fn token_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.token_file).into_owned())
    }

    /// `GITHUB_TOKEN` when set, otherwise the content of the token file.
    pub fn resolve_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var("GITHUB_TOKEN")
            && !token.trim().is_empty()
        {
            return Ok(token.trim().to_string());
        }
        read_token_file(&self.token_path())
    }
}

fn read_token_file(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        BotError::Other(format!(
            "no GitHub token: GITHUB_TOKEN is unset and {} is unreadable: {e}",
            path.display()
        ))
    })?;
    let token = content.trim();
    if token.is_empty() {
        return Err(BotError::Other(format!(
            "no GitHub token: {} is empty",
            path.display()
        )));
    }
    Ok(token.to_string())
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct LoggingSettings {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub file: String,
}

impl LoggingSettings {
    /// Unknown level names fall back to `warn`.
    pub fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::Warn)
    }

    pub fn file_path(&self) -> Option<PathBuf> {
        if self.file.trim().is_empty() {
            return None;
        }
        Some(PathBuf::from(shellexpand::tilde(&self.file).into_owned()))
    }
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    bot: BotOverlay,
    #[serde(default)]
    github: GitHubOverlay,
    #[serde(default)]
    logging: LoggingOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct BotOverlay {
    name: Option<String>,
    docs_url: Option<String>,
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    plugins: Vec<String>,
    #[serde(default)]
    remove_plugins: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct GitHubOverlay {
    endpoint: Option<String>,
    raw_content_url: Option<String>,
    token_file: Option<String>,
    timeout_secs: Option<u64>,
    dry_run: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingOverlay {
    level: Option<String>,
    file: Option<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
pub(crate) fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

fn set_if<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the overlay at `path` if given, otherwise
    ///    ~/.config/pr-gate/config.toml when it exists
    ///
    /// An explicit path must exist and parse. The implicit one is best-effort.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                let overlay = toml::from_str(&content).map_err(|source| BotError::Config {
                    location: path.display().to_string(),
                    source,
                })?;
                config.apply_overlay(overlay);
            }
            None => {
                if let Some(overlay) = Self::load_user_overlay() {
                    config.apply_overlay(overlay);
                }
            }
        }
        Ok(config)
    }

    /// Try to load user overlay from ~/.config/pr-gate/config.toml.
    fn load_user_overlay() -> Option<ConfigOverlay> {
        let home = std::env::var_os("HOME")?;
        let path = Path::new(&home).join(".config/pr-gate/config.toml");
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                // Logger is not up yet: it is configured from this file.
                eprintln!("pr-gate: config parse error: {e}");
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let b = overlay.bot;
        set_if(&mut self.bot.name, b.name);
        set_if(&mut self.bot.docs_url, b.docs_url);
        merge_list(&mut self.bot.plugins, b.plugins, &b.remove_plugins, b.replace);

        let g = overlay.github;
        set_if(&mut self.github.endpoint, g.endpoint);
        set_if(&mut self.github.raw_content_url, g.raw_content_url);
        set_if(&mut self.github.token_file, g.token_file);
        set_if(&mut self.github.timeout_secs, g.timeout_secs);
        set_if(&mut self.github.dry_run, g.dry_run);

        let l = overlay.logging;
        set_if(&mut self.logging.level, l.level);
        set_if(&mut self.logging.file, l.file);
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    pub(crate) fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

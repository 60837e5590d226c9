//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{SortMode, is_valid_forum_name};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API client settings
    #[serde(default)]
    pub reddit: RedditConfig,

    /// What to fetch
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Per-column retry policy for rate-limited extraction
    #[serde(default)]
    pub retry: RetryConfig,

    /// Snapshot and combined table locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Snapshot merge behavior
    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.reddit.user_agent.trim().is_empty() {
            return Err(AppError::validation("reddit.user_agent is empty"));
        }
        if self.reddit.timeout_secs == 0 {
            return Err(AppError::validation("reddit.timeout_secs must be > 0"));
        }
        if self.fetch.forums.is_empty() {
            return Err(AppError::validation("No forums defined"));
        }
        if self.fetch.forums.iter().any(|f| f.trim().is_empty()) {
            return Err(AppError::validation("fetch.forums contains an empty name"));
        }
        if let Some(bad) = self.fetch.forums.iter().find(|f| !is_valid_forum_name(f)) {
            return Err(AppError::validation(format!(
                "fetch.forums: '{bad}' is not a valid forum name"
            )));
        }
        if self.fetch.limit == 0 {
            return Err(AppError::validation("fetch.limit must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        self.fetch.sort_mode()?;
        Ok(())
    }
}

/// Remote API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    /// User-Agent header for API requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// JSON file holding `client_id` and `client_secret`
    #[serde(default = "defaults::credentials_file")]
    pub credentials_file: PathBuf,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum comments requested per submission
    #[serde(default = "defaults::comment_limit")]
    pub comment_limit: usize,

    #[serde(default = "defaults::auth_url")]
    pub auth_url: String,

    #[serde(default = "defaults::api_url")]
    pub api_url: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            credentials_file: defaults::credentials_file(),
            timeout_secs: defaults::timeout(),
            comment_limit: defaults::comment_limit(),
            auth_url: defaults::auth_url(),
            api_url: defaults::api_url(),
        }
    }
}

/// Listing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Forums (subreddits) fetched in order
    #[serde(default = "defaults::forums")]
    pub forums: Vec<String>,

    /// One of new, hot, rising, top, controversial
    #[serde(default = "defaults::sort")]
    pub sort: String,

    /// Only used by top and controversial
    #[serde(default = "defaults::time_window")]
    pub time_window: Option<String>,

    /// Maximum number of items requested per forum
    #[serde(default = "defaults::limit")]
    pub limit: usize,
}

impl FetchConfig {
    /// Parse the configured sort mode and time window.
    pub fn sort_mode(&self) -> Result<SortMode> {
        SortMode::parse(&self.sort, self.time_window.as_deref())
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            forums: defaults::forums(),
            sort: defaults::sort(),
            time_window: defaults::time_window(),
            limit: defaults::limit(),
        }
    }
}

/// Retry settings for rate-limited column extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per column, including the first
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Fixed wait between attempts
    #[serde(default = "defaults::backoff_secs")]
    pub backoff_secs: u64,
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            backoff_secs: defaults::backoff_secs(),
        }
    }
}

/// Snapshot store locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Defaults to `{snapshot_dir}/combined`
    #[serde(default)]
    pub combined_dir: Option<PathBuf>,
}

impl PathsConfig {
    pub fn combined_dir(&self) -> PathBuf {
        self.combined_dir
            .clone()
            .unwrap_or_else(|| self.snapshot_dir.join("combined"))
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: defaults::snapshot_dir(),
            combined_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Delete snapshot files once they are part of the combined table
    #[serde(default)]
    pub delete_merged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Reddit defaults
    pub fn user_agent() -> String {
        concat!("subsnap/", env!("CARGO_PKG_VERSION"), " (snapshot collector)").into()
    }
    pub fn credentials_file() -> PathBuf {
        PathBuf::from("secrets/reddit_api.json")
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn comment_limit() -> usize {
        500
    }
    pub fn auth_url() -> String {
        "https://www.reddit.com/api/v1/access_token".into()
    }
    pub fn api_url() -> String {
        "https://oauth.reddit.com".into()
    }

    // Fetch defaults
    pub fn forums() -> Vec<String> {
        vec!["washingtondc".into(), "nova".into(), "bikedc".into()]
    }
    pub fn sort() -> String {
        "new".into()
    }
    pub fn time_window() -> Option<String> {
        Some("all".into())
    }
    pub fn limit() -> usize {
        1000
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        10
    }
    pub fn backoff_secs() -> u64 {
        30
    }

    // Path defaults
    pub fn snapshot_dir() -> PathBuf {
        PathBuf::from("data")
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

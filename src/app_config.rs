use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::polling::{PollOptions, RetryPolicy};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Poll intervals and attempt caps per job kind
    #[serde(default)]
    pub polling: PollingConfig,

    /// Retry policy for dashboard loads
    #[serde(default)]
    pub retry: RetryConfig,

    /// Text reflow settings
    #[serde(default)]
    pub formatting: FormattingConfig,

    /// Local content cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Image generation settings
    #[serde(default)]
    pub images: ImagesConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Backend service configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BackendConfig {
    /// API root URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Append `/` to every request path
    #[serde(default)]
    pub trailing_slash: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            trailing_slash: false,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Interval and optional cap for one kind of job
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval_ms: u64,

    /// `None` polls until the job reaches a terminal state
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl PollSettings {
    pub fn options(&self) -> PollOptions {
        let options = PollOptions::every(Duration::from_millis(self.interval_ms));
        match self.max_attempts {
            Some(max) => options.with_max_attempts(max),
            None => options,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PollingConfig {
    #[serde(default = "default_research_poll")]
    pub research: PollSettings,

    #[serde(default = "default_content_poll")]
    pub content: PollSettings,

    #[serde(default = "default_title_poll")]
    pub titles: PollSettings,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            research: default_research_poll(),
            content: default_content_poll(),
            titles: default_title_poll(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first
    #[serde(default = "default_retry_count")]
    pub max_retries: u32,

    /// Backoff before the second attempt; doubles after each failure
    #[serde(default = "default_retry_backoff_ms")]
    pub backoff_base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_retry_count(),
            backoff_base_ms: default_retry_backoff_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.backoff_base_ms))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FormattingConfig {
    /// Letters per wrapped line
    #[serde(default = "default_target_length")]
    pub target_length: usize,

    /// Reflow article text when displaying it
    #[serde(default = "default_true")]
    pub mobile: bool,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            target_length: default_target_length(),
            mobile: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache file; defaults to the user cache directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImagesConfig {
    /// Seconds before a "still generating" notice is shown
    #[serde(default = "default_slow_notice_secs")]
    pub slow_notice_secs: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            slow_notice_secs: default_slow_notice_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_research_poll() -> PollSettings {
    PollSettings {
        interval_ms: 2000,
        max_attempts: Some(30),
    }
}

fn default_content_poll() -> PollSettings {
    PollSettings {
        interval_ms: 5000,
        max_attempts: None,
    }
}

fn default_title_poll() -> PollSettings {
    PollSettings {
        interval_ms: 5000,
        max_attempts: None,
    }
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_target_length() -> usize {
    crate::formatting::DEFAULT_TARGET_LENGTH
}

fn default_slow_notice_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let endpoint = Url::parse(&self.backend.endpoint)
            .with_context(|| format!("Invalid backend endpoint: {}", self.backend.endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(anyhow!("Backend endpoint must use http or https: {}", self.backend.endpoint));
        }

        if self.backend.timeout_secs == 0 {
            return Err(anyhow!("Backend timeout must be at least one second"));
        }

        for (name, settings) in [
            ("research", &self.polling.research),
            ("content", &self.polling.content),
            ("titles", &self.polling.titles),
        ] {
            if settings.interval_ms == 0 {
                return Err(anyhow!("Poll interval for {} must be positive", name));
            }
            if settings.max_attempts == Some(0) {
                return Err(anyhow!("Attempt cap for {} must be positive when set", name));
            }
        }

        if self.retry.max_retries == 0 {
            return Err(anyhow!("Retry count must be at least 1"));
        }

        if self.formatting.target_length == 0 {
            return Err(anyhow!("Formatting target length must be positive"));
        }

        Ok(())
    }

    /// Read the configuration at `path`, writing a default file first if
    /// none exists
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file not found at '{}', creating default config.", path.display());
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Cache file location, falling back to the user cache directory
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.cache
            .path
            .clone()
            .or_else(crate::cache::ContentCache::default_path)
    }
}

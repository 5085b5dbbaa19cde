//! Configuration management for Postcraft.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RetryConfig;
use crate::agents::BrandProfile;
use crate::completion::{ModelRouting, DEFAULT_API_VERSION, DEFAULT_BASE_URL};

/// Environment variable overriding where run snapshots are stored.
pub const RUNS_DIR_ENV: &str = "POSTCRAFT_RUNS_DIR";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Language-model service settings
    pub completion: CompletionConfig,

    /// Retry policy for transient provider failures
    pub retry: RetrySettings,

    /// Model per agent kind
    pub models: ModelRouting,

    /// Domain context handed to every step handler
    pub brand: BrandProfile,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory for run snapshots (defaults to the data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runs_dir: Option<PathBuf>,

    /// Directory exported articles are written to by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

/// Language-model service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Messages API endpoint
    pub base_url: String,

    /// `anthropic-version` header value
    pub api_version: String,

    /// Minimum spacing between consecutive requests, in milliseconds
    pub min_request_interval_ms: u64,

    /// Per-request timeout, in seconds
    pub request_timeout_secs: u64,
}

/// Retry settings as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts per completion, including the first
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,

    /// Backoff multiplier between retries
    pub backoff_multiplier: f64,

    /// Upper bound on a single delay, in milliseconds
    pub max_delay_ms: u64,

    /// Add up to 25% jitter to delays
    pub jitter: bool,
}

impl Config {
    /// Load configuration from default locations.
    pub fn load() -> anyhow::Result<Self> {
        // Try local config first
        let local_config = PathBuf::from(".postcraft.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        // Try global config
        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        self.save_to(&config_dir.join("config.toml"))
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(path.to_path_buf())
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("postcraft"))
    }

    /// Get the data directory path.
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("postcraft"))
    }

    /// Directory for run snapshots.
    ///
    /// `POSTCRAFT_RUNS_DIR` wins over `general.runs_dir`, which wins over
    /// `<data dir>/postcraft/runs`; `./.postcraft/runs` is the last resort.
    pub fn runs_dir(&self) -> PathBuf {
        if let Some(dir) = std::env::var_os(RUNS_DIR_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        if let Some(dir) = &self.general.runs_dir {
            return dir.clone();
        }
        Self::data_dir()
            .map(|d| d.join("runs"))
            .unwrap_or_else(|| PathBuf::from(".postcraft").join("runs"))
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            min_request_interval_ms: 1000,
            request_timeout_secs: 120,
        }
    }
}

impl CompletionConfig {
    /// Minimum spacing between requests.
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            backoff_multiplier: defaults.backoff_multiplier,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            jitter: defaults.jitter,
        }
    }
}

impl RetrySettings {
    /// Convert to the runtime retry configuration.
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            jitter: self.jitter,
        }
    }
}

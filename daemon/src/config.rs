use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::dispatch::DEFAULT_GATEWAY_URL;
use crate::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::paths;
use crate::watchlist::Watchlist;

pub const CHANNEL_ID_ENV: &str = "WHATSAPP_GROUP_ID";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const EVENTS_PATH_ENV: &str = "EVENTS_PATH";
pub const WATCHLIST_ENV: &str = "LP_LOSS_WATCHLIST";
pub const GATEWAY_URL_ENV: &str = "WHATSAPP_GATEWAY_URL";

pub const DEFAULT_WATCHLIST: &str = "player1,player2";
pub const DEFAULT_STABILITY_THRESHOLD_MS: u64 = 2000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_MAX_CONCURRENT_FILES: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
}

// ── Tuning file ────────────────────────────────────────────────────────────────

/// Optional tuning knobs. Deserialized from `announcer.toml`; every field has
/// a default so the file may be absent or partial.
#[derive(Debug, Deserialize, Default)]
pub struct Tuning {
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Where the daemon writes its status file.
    pub status_file: Option<PathBuf>,
}

/// Write-stability debounce for new event files.
#[derive(Debug, Deserialize, Clone)]
pub struct WatcherConfig {
    /// How long size and mtime must stay unchanged before a file is reported.
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold_ms: u64,
    /// How often pending files are re-checked.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            stability_threshold_ms: DEFAULT_STABILITY_THRESHOLD_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WatcherConfig {
    pub fn stability_threshold(&self) -> Duration {
        Duration::from_millis(self.stability_threshold_ms)
    }

    /// Never zero; a zero interval would make `tokio::time::interval` panic.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Upper bound on event files processed at the same time.
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_files: DEFAULT_MAX_CONCURRENT_FILES,
        }
    }
}

/// Loads the tuning file at `path`, returning `Tuning::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Tuning> {
    if !path.exists() {
        return Ok(Tuning::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

// ── Resolved configuration ─────────────────────────────────────────────────────

/// Everything the daemon needs, resolved once at startup and never mutated.
#[derive(Debug)]
pub struct Config {
    /// Chat channel that receives every announcement.
    pub channel_id: String,
    pub api_key: String,
    pub events_dir: PathBuf,
    pub watchlist: Watchlist,
    pub gateway_url: String,
    pub status_file: PathBuf,
    pub watcher: WatcherConfig,
    pub generation: GenerationConfig,
    pub max_concurrent_files: usize,
}

impl Config {
    /// Combines the tuning file with environment values obtained through `lookup`.
    ///
    /// The channel id and API key are required; everything else has a default.
    /// Blank values count as unset.
    pub fn resolve(
        tuning: Tuning,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Config, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let channel_id = get(CHANNEL_ID_ENV).ok_or(ConfigError::Missing(CHANNEL_ID_ENV))?;
        let api_key = get(API_KEY_ENV).ok_or(ConfigError::Missing(API_KEY_ENV))?;
        let events_dir = get(EVENTS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(paths::DEFAULT_EVENTS_DIR));
        let watchlist = Watchlist::from_csv(
            &get(WATCHLIST_ENV).unwrap_or_else(|| DEFAULT_WATCHLIST.to_string()),
        );
        let gateway_url = get(GATEWAY_URL_ENV).unwrap_or(tuning.dispatch.gateway_url);

        Ok(Config {
            channel_id,
            api_key,
            events_dir,
            watchlist,
            gateway_url,
            status_file: tuning.status_file.unwrap_or_else(paths::default_status_file),
            watcher: tuning.watcher,
            generation: tuning.generation,
            max_concurrent_files: tuning.pipeline.max_concurrent_files.max(1),
        })
    }

    /// Resolves against the process environment.
    pub fn from_env(tuning: Tuning) -> Result<Config, ConfigError> {
        Self::resolve(tuning, |key| std::env::var(key).ok())
    }
}

fn default_stability_threshold() -> u64 {
    DEFAULT_STABILITY_THRESHOLD_MS
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_max_concurrent_files() -> usize {
    DEFAULT_MAX_CONCURRENT_FILES
}

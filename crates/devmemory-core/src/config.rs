//! DevMemory configuration system.
//!
//! Loaded from `~/.devmemory/config.toml`; credentials may come from the
//! environment instead so the file can stay free of secrets.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DevMemoryError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevMemoryConfig {
    /// Absolute paths of the repositories to scan.
    #[serde(default)]
    pub repos: Vec<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

fn default_data_dir() -> String { "~/.devmemory/data".into() }
fn default_logs_dir() -> String { "~/.devmemory/logs".into() }

impl Default for DevMemoryConfig {
    fn default() -> Self {
        Self {
            repos: Vec::new(),
            data_dir: default_data_dir(),
            logs_dir: default_logs_dir(),
            schedule: ScheduleConfig::default(),
            discord: DiscordConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

impl DevMemoryConfig {
    /// Load config from the default path (~/.devmemory/config.toml), then
    /// apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from a specific path (no environment overrides).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DevMemoryError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DevMemoryError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Override file values with whatever `lookup` yields for the well-known
    /// variable names. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(token) = get("DISCORD_BOT_TOKEN") {
            self.discord.bot_token = token;
        }
        if let Some(channel) = get("DISCORD_CHANNEL_ID") {
            self.discord.channel_id = channel;
        }
        if let Some(user) = get("DISCORD_USER_ID") {
            self.discord.mention_user_id = Some(user);
        }
        if let Some(url) = get("LLM_API_URL") {
            self.ai.endpoint = url;
        }
        if let Some(key) = get("LLM_API_KEY") {
            self.ai.api_key = key;
        }
        if let Some(model) = get("LLM_MODEL") {
            self.ai.model = model;
        }
        if let Some(repos) = get("DEVMEMORY_REPOS") {
            self.repos = repos
                .split(':')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the DevMemory home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".devmemory")
    }

    pub fn data_path(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }

    pub fn logs_path(&self) -> PathBuf {
        expand_path(&self.logs_dir)
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_path().join("state.json")
    }

    pub fn repo_paths(&self) -> Vec<PathBuf> {
        self.repos.iter().map(|r| expand_path(r)).collect()
    }
}

/// Expand a leading `~` into the user's home directory.
pub fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).as_ref())
}

/// When the daily job considers a day finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Hour (local time) at which a new report window opens.
    #[serde(default = "default_cutover_hour")]
    pub cutover_hour: u32,
    /// Skip invocations that land on Saturday or Sunday. Monday's window
    /// already reaches back to Friday's cutover, so a weekend report would
    /// repeat its commits.
    #[serde(default = "default_weekdays_only")]
    pub weekdays_only: bool,
}

fn default_cutover_hour() -> u32 { 6 }

fn default_weekdays_only() -> bool { true }

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cutover_hour: default_cutover_hour(),
            weekdays_only: default_weekdays_only(),
        }
    }
}

/// Discord bot delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub channel_id: String,
    /// User to ping with the report.
    #[serde(default)]
    pub mention_user_id: Option<String>,
    #[serde(default = "default_discord_api")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Fixed wait before the single transient retry.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Longest Markdown body (in characters) still sent inline.
    #[serde(default = "default_inline_limit")]
    pub inline_limit: usize,
}

fn bool_true() -> bool { true }
fn default_discord_api() -> String { "https://discord.com/api/v10".into() }
fn default_timeout_secs() -> u64 { 10 }
fn default_retry_delay_secs() -> u64 { 5 }
fn default_inline_limit() -> usize { 1800 }

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: String::new(),
            channel_id: String::new(),
            mention_user_id: None,
            api_base: default_discord_api(),
            timeout_secs: default_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            inline_limit: default_inline_limit(),
        }
    }
}

/// Optional AI narrative (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Full chat-completions URL.
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ai_endpoint() -> String { "https://api.openai.com/v1/chat/completions".into() }
fn default_ai_model() -> String { "gpt-4o-mini".into() }
fn default_ai_timeout_secs() -> u64 { 30 }

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_ai_endpoint(),
            api_key: String::new(),
            model: default_ai_model(),
            timeout_secs: default_ai_timeout_secs(),
        }
    }
}

//! Configuration management for ChatRelay.
//!
//! All ChatRelay crates share a unified configuration file at
//! `~/.chatrelay/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Explicit config file values
//! 2. Environment variables (CHATRELAY_* prefix, plus provider keys)
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `CHATRELAY_PORT` → server.port
//! - `CHATRELAY_BIND_ADDRESS` → server.bind
//! - `CHATRELAY_LOG_LEVEL` → observability.log_level
//! - `OPENAI_API_KEY` → openai.api_key
//! - `SYNOLOGY_WEBHOOK_TOKEN` → synology.webhook_token
//! - `SYNOLOGY_WEBHOOK_URL` → synology.webhook_url

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".chatrelay"),
        |dirs| dirs.home_dir().join(".chatrelay"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Default is `0.0.0.0` so Synology Chat can reach the
    /// webhook from another host.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8008
}

// ============================================================================
// OpenAI Configuration
// ============================================================================

/// Completion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key. Usually supplied via `OPENAI_API_KEY` instead of the file.
    #[serde(default)]
    pub api_key: String,

    /// Base URL (override for Azure or compatible APIs).
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens to generate (provider default when unset).
    #[serde(default)]
    pub max_tokens: Option<i64>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

// ============================================================================
// Synology Chat Configuration
// ============================================================================

/// Synology Chat channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynologyConfig {
    /// Shared secret carried in the outgoing-webhook form body.
    #[serde(default)]
    pub webhook_token: String,

    /// Incoming-webhook URL used to deliver messages back to the user.
    #[serde(default)]
    pub webhook_url: String,

    /// Acknowledgement text sent before the completion call.
    #[serde(default = "default_ack_text")]
    pub ack_text: String,
}

impl Default for SynologyConfig {
    fn default() -> Self {
        Self {
            webhook_token: String::new(),
            webhook_url: String::new(),
            ack_text: default_ack_text(),
        }
    }
}

fn default_ack_text() -> String {
    "正在获取结果，请稍候...".to_string()
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Conversation session policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum prior history entries retained before a new message is
    /// appended. The list may transiently hold one more entry after the
    /// append.
    #[serde(default = "default_max_conversation_length")]
    pub max_conversation_length: usize,

    /// Idle minutes after which a session expires.
    #[serde(default = "default_max_time_gap_minutes")]
    pub max_time_gap_minutes: i64,

    /// Keywords that clear the session when a message matches one exactly
    /// (after trimming and lowercasing).
    #[serde(default = "default_reset_keywords")]
    pub reset_keywords: Vec<String>,

    /// Text echoed back when a reset keyword is received.
    #[serde(default = "default_reset_echo")]
    pub reset_echo: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_conversation_length: default_max_conversation_length(),
            max_time_gap_minutes: default_max_time_gap_minutes(),
            reset_keywords: default_reset_keywords(),
            reset_echo: default_reset_echo(),
        }
    }
}

fn default_max_conversation_length() -> usize {
    10
}

fn default_max_time_gap_minutes() -> i64 {
    30
}

fn default_reset_keywords() -> Vec<String> {
    [
        "new", "refresh", "00", "restart", "刷新", "新话题", "退下", "结束", "over",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_reset_echo() -> String {
    "----------------------------".to_string()
}

// ============================================================================
// Prompt Configuration
// ============================================================================

/// Prompt assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptConfig {
    /// System prompt text. Available to the assembler but not prepended
    /// unless `use_system_prompt` is set.
    #[serde(default)]
    pub system_prompt: String,

    /// Whether to prepend the system prompt to each request.
    #[serde(default)]
    pub use_system_prompt: bool,
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for ChatRelay.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Completion provider settings
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Synology Chat channel settings
    #[serde(default)]
    pub synology: SynologyConfig,

    /// Session policy settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Prompt assembly settings
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Observability settings
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration and apply environment overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("CHATRELAY_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(bind) = std::env::var("CHATRELAY_BIND_ADDRESS") {
            self.server.bind = bind;
        }
        if let Ok(level) = std::env::var("CHATRELAY_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai.api_key = key;
        }
        if let Ok(token) = std::env::var("SYNOLOGY_WEBHOOK_TOKEN") {
            self.synology.webhook_token = token;
        }
        if let Ok(url) = std::env::var("SYNOLOGY_WEBHOOK_URL") {
            self.synology.webhook_url = url;
        }
    }
}

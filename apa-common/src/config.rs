//! Configuration loading and resolution
//!
//! Bootstrap settings come from an optional TOML file. Values that may also be
//! given on the command line or in the environment are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: defaults are used and a warning logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Compiled default service API base URL
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

/// Environment variable overriding the API base URL
pub const API_BASE_ENV: &str = "APA_API_BASE";

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "APA_CONFIG";

/// Default labels for the seven-stage patent drafting pipeline
pub const DEFAULT_STEP_LABELS: [&str; 7] = [
    "PDF preprocessing",
    "Base structure",
    "Embodiments",
    "Claims",
    "Abstract",
    "Figure prompts",
    "Figure generation",
];

/// Configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Service API base URL, e.g. `http://localhost:8000/api`
    #[serde(default)]
    pub api_base: Option<String>,

    /// Ordered pipeline step labels; fixes the step count for a session
    #[serde(default = "default_steps")]
    pub steps: Vec<String>,

    /// Event stream settings
    #[serde(default)]
    pub stream: StreamConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Session log capacity; `None` keeps every entry
    #[serde(default)]
    pub max_log_entries: Option<usize>,
}

/// Event stream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Seconds without any frame (heartbeats included) before the stream is
    /// considered failed. Must exceed the service heartbeat interval (10s).
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Buffered events between the stream reader and the session
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_steps() -> Vec<String> {
    DEFAULT_STEP_LABELS.iter().map(|s| s.to_string()).collect()
}

fn default_idle_timeout_secs() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            steps: default_steps(),
            stream: StreamConfig::default(),
            logging: LoggingConfig::default(),
            max_log_entries: None,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl StreamConfig {
    pub fn idle_timeout(&self) -> Duration {
        crate::time::secs_to_duration(self.idle_timeout_secs)
    }
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the tracker cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::Config("steps must list at least one step".to_string()));
        }
        if self.stream.idle_timeout_secs == 0 {
            return Err(Error::Config("stream.idle_timeout_secs must be > 0".to_string()));
        }
        if self.stream.channel_capacity == 0 {
            return Err(Error::Config("stream.channel_capacity must be > 0".to_string()));
        }
        if self.max_log_entries == Some(0) {
            return Err(Error::Config("max_log_entries must be > 0 when set".to_string()));
        }
        Ok(())
    }
}

/// Load TOML configuration with graceful degradation
///
/// `None` or a missing file yields defaults; an unreadable or invalid file is an error.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        info!("No config file found, using built-in defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using built-in defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = TomlConfig::from_toml_str(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve the config file location
///
/// Priority: explicit path → `APA_CONFIG` → `<config_dir>/apa/config.toml`.
/// Returns `None` when no candidate exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument (returned even if missing so the caller can warn)
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    dirs::config_dir()
        .map(|d| d.join("apa").join("config.toml"))
        .filter(|p| p.exists())
}

/// Resolve the service API base URL
///
/// Priority: CLI → `APA_API_BASE` → TOML `api_base` → [`DEFAULT_API_BASE`].
/// Trailing slashes are stripped.
pub fn resolve_api_base(cli_arg: Option<&str>, toml_config: &TomlConfig) -> String {
    let env_value = std::env::var(API_BASE_ENV).ok();

    let resolved = cli_arg
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .or_else(|| env_value.filter(|s| !s.trim().is_empty()))
        .or_else(|| toml_config.api_base.clone().filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

    resolved.trim().trim_end_matches('/').to_string()
}

//! Configuration Management
//!
//! One settings file with four sections: `interpreter`, `job`, `playback`
//! and `logging`. Files are JSON or TOML, chosen by extension. Missing
//! sections and keys fall back to their defaults.

use crate::error::{Result, SettingsError};
use nckit_core::EventBusConfig;
use nckit_interpreter::InterpreterConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name used inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "settings.toml";

/// Log levels accepted by the `logging.level` key
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Job and notification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Capacity of the broadcast channel behind the event bus
    pub event_channel_capacity: usize,
    /// Keep a history of published events
    pub event_history: bool,
    /// Maximum number of events kept in history
    pub event_history_size: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            event_channel_capacity: 256,
            event_history: false,
            event_history_size: 1000,
        }
    }
}

impl JobSettings {
    /// Event bus configuration for a new job
    pub fn event_bus_config(&self) -> EventBusConfig {
        EventBusConfig {
            channel_capacity: self.event_channel_capacity,
            enable_history: self.event_history,
            max_history_size: self.event_history_size,
            ..EventBusConfig::default()
        }
    }
}

/// Playback cursor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Time between steps while playing, in milliseconds
    pub step_interval_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            step_interval_ms: 200,
        }
    }
}

impl PlaybackSettings {
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete application configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial modal state and arc tolerance
    pub interpreter: InterpreterConfig,
    /// Event bus sizing
    pub job: JobSettings,
    /// Playback timer
    pub playback: PlaybackSettings,
    /// Log output
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(SettingsError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default settings file location, e.g. `~/.config/nckit/settings.toml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("nckit").join(CONFIG_FILE_NAME))
            .ok_or(SettingsError::NoConfigDirectory)
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Load from `path` when given, otherwise from the default location
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        let Ok(default_path) = Self::default_path() else {
            return Ok(Self::default());
        };
        if default_path.exists() {
            Self::load_from_file(&default_path)
        } else {
            tracing::debug!(
                "No settings at {}, using defaults",
                default_path.display()
            );
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        let io_error = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, content).map_err(io_error)?;

        tracing::debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.interpreter
            .validate()
            .map_err(|reason| SettingsError::invalid("interpreter", reason))?;

        if self.job.event_channel_capacity == 0 {
            return Err(SettingsError::invalid(
                "job.event_channel_capacity",
                "must be > 0",
            ));
        }
        if self.job.event_history && self.job.event_history_size == 0 {
            return Err(SettingsError::invalid(
                "job.event_history_size",
                "must be > 0 when history is enabled",
            ));
        }

        if self.playback.step_interval_ms == 0 {
            return Err(SettingsError::invalid(
                "playback.step_interval_ms",
                "must be > 0",
            ));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(SettingsError::invalid(
                "logging.level",
                format!(
                    "unknown level '{}', expected one of {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

//! Error types for the settings crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, validating or saving settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file extension is neither `.json` nor `.toml`.
    #[error("Unsupported settings format for {0}: expected .json or .toml")]
    UnsupportedFormat(PathBuf),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// A setting holds a value that cannot be used.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    /// The platform config directory could not be determined.
    #[error("No configuration directory available on this platform")]
    NoConfigDirectory,
}

impl SettingsError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

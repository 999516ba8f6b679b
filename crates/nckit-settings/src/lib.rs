//! NCKit Settings Crate
//!
//! Loads, validates and saves the application configuration.

pub mod config;
pub mod error;

pub use config::{
    Config, JobSettings, LoggingSettings, PlaybackSettings, CONFIG_FILE_NAME, LOG_LEVELS,
};
pub use error::{Result, SettingsError};

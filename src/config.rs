//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the face-config.toml file.
//! It provides a centralized way to configure the redraw cadence, the sync path,
//! display text sizes for round and rectangular screens, and logging.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "face-config.toml";

/// Errors raised while reading or persisting configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file is not valid TOML for [`Config`]
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be serialized to TOML
    #[error("config encode: {0}")]
    Encode(#[from] toml::ser::Error),

    /// Config file could not be read or written
    #[error("config IO: {0}")]
    Io(#[from] std::io::Error),
}

/// Application configuration loaded from face-config.toml
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Interactive redraw cadence
    pub scheduler: SchedulerConfig,
    /// Companion data-sync settings
    pub sync: SyncConfig,
    /// Display and text sizing
    pub display: DisplayConfig,
    /// Log filter for the binary
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Redraw scheduler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Interactive update period in milliseconds. Redraws align to multiples of it.
    pub interactive_update_ms: u64,
}

/// Data-sync configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Logical path carrying weather items (e.g. "/weather")
    pub weather_path: String,
}

/// Display configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// 24-hour clock when true, 12-hour with AM/PM otherwise
    pub use_24_hour: bool,
    /// Directory holding condition icons as PNG files (e.g. "ic_clear.png")
    #[serde(default)]
    pub icon_dir: Option<PathBuf>,
    /// Text sizes on round screens
    pub round: TextSizes,
    /// Text sizes on rectangular screens
    pub rect: TextSizes,
}

/// Text sizes in pixels for one screen shape
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TextSizes {
    pub time: f32,
    pub date: f32,
    pub temperature: f32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// env_logger filter used when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scheduler: SchedulerConfig {
                interactive_update_ms: 1000,
            },
            sync: SyncConfig {
                weather_path: crate::sync::WEATHER_PATH.to_string(),
            },
            display: DisplayConfig {
                use_24_hour: true,
                icon_dir: None,
                round: TextSizes {
                    time: 45.0,
                    date: 20.0,
                    temperature: 30.0,
                },
                rect: TextSizes {
                    time: 40.0,
                    date: 18.0,
                    temperature: 26.0,
                },
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl DisplayConfig {
    /// Text sizes for the given screen shape
    pub fn sizes(&self, is_round: bool) -> TextSizes {
        if is_round {
            self.round
        } else {
            self.rect
        }
    }
}

impl Config {
    /// Load configuration from face-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load_from_path(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.as_ref().display());
                config
            }
            Err(e) => Self::fallback(&e),
        }
    }

    /// Read and parse the config file without falling back.
    pub fn try_load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Default configuration, logging why the file was not used.
    pub fn fallback(error: &ConfigError) -> Self {
        match error {
            ConfigError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config file found, using default configuration");
            }
            other => {
                log::warn!("Invalid config file: {}", other);
                log::warn!("Using default configuration");
            }
        }
        Self::default()
    }

    /// Save current configuration to the given path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Save current configuration to face-config.toml
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(DEFAULT_CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scheduler.interactive_update_ms, 1000);
        assert_eq!(config.sync.weather_path, "/weather");
        assert!(config.display.use_24_hour);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_sizes_follow_screen_shape() {
        let config = Config::default();
        assert_eq!(config.display.sizes(true), config.display.round);
        assert_eq!(config.display.sizes(false), config.display.rect);
    }

    #[test]
    fn test_save_then_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.scheduler.interactive_update_ms = 500;
        config.display.use_24_hour = false;
        config.save_to_path(temp_file.path()).unwrap();

        let loaded = Config::load_from_path(temp_file.path());
        assert_eq!(loaded.scheduler.interactive_update_ms, 500);
        assert!(!loaded.display.use_24_hour);
    }

    #[test]
    fn test_logging_section_is_optional() {
        let temp_file = NamedTempFile::new().unwrap();
        let toml_str = r#"
[scheduler]
interactive_update_ms = 250

[sync]
weather_path = "/weather"

[display]
use_24_hour = false

[display.round]
time = 45.0
date = 20.0
temperature = 30.0

[display.rect]
time = 40.0
date = 18.0
temperature = 26.0
"#;
        fs::write(temp_file.path(), toml_str).unwrap();

        let config = Config::load_from_path(temp_file.path());
        assert_eq!(config.scheduler.interactive_update_ms, 250);
        assert_eq!(config.logging.level, "info");
        assert!(config.display.icon_dir.is_none());
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "not = [valid").unwrap();
        let config = Config::load_from_path(temp_file.path());
        assert_eq!(config.scheduler.interactive_update_ms, 1000);
    }

    #[test]
    fn test_try_load_reports_why_file_was_unusable() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "not = [valid").unwrap();
        assert!(matches!(
            Config::try_load_from_path(temp_file.path()),
            Err(ConfigError::Parse(_))
        ));

        match Config::try_load_from_path("/nonexistent/path") {
            Err(ConfigError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected a missing file, got {:?}", other.map(|_| ())),
        }

        let fallback = Config::fallback(&ConfigError::Io(std::io::ErrorKind::NotFound.into()));
        assert_eq!(fallback.scheduler.interactive_update_ms, 1000);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config.sync.weather_path, "/weather");
    }
}

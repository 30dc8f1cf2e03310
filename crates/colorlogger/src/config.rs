//! Configuration management for colorlogger.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "colorlogger";

/// Directory under the data dir that stands in for the SD card.
const CARD_DIR_NAME: &str = "card";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `COLORLOGGER_`)
/// 2. TOML config file at `~/.config/colorlogger/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Acquisition loop configuration.
    pub acquisition: AcquisitionConfig,
    /// Button input configuration.
    pub input: InputConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Logical drive name to mount.
    pub drive: String,
    /// Host directory backing the drive.
    /// Defaults to `~/.local/share/colorlogger/card`
    pub volume_root: Option<PathBuf>,
    /// Rows between durability syncs.
    pub flush_every: u32,
}

/// Acquisition loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Period of the reconciliation loop in milliseconds.
    pub tick_interval_ms: u64,
    /// Minimum spacing between samples in milliseconds.
    pub sample_period_ms: u64,
}

/// Button input configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Minimum spacing between accepted button edges in milliseconds.
    pub debounce_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            drive: "sd0".to_string(),
            volume_root: None, // Will be resolved to default at runtime
            flush_every: 10,
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            sample_period_ms: 100,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("COLORLOGGER_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.drive.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "drive must not be empty".to_string(),
            });
        }

        if self.storage.flush_every == 0 {
            return Err(Error::ConfigValidation {
                message: "flush_every must be greater than 0".to_string(),
            });
        }

        if self.acquisition.tick_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "tick_interval_ms must be greater than 0".to_string(),
            });
        }

        if self.acquisition.sample_period_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "sample_period_ms must be greater than 0".to_string(),
            });
        }

        if self.input.debounce_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "debounce_ms must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the volume root, resolving defaults if not set.
    #[must_use]
    pub fn volume_root(&self) -> PathBuf {
        self.storage
            .volume_root
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(CARD_DIR_NAME))
    }

    /// Get the loop tick period as a Duration.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.acquisition.tick_interval_ms)
    }

    /// Get the sampling period as a Duration.
    #[must_use]
    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.acquisition.sample_period_ms)
    }

    /// Get the debounce window as a Duration.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.input.debounce_ms)
    }
}

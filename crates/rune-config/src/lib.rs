//! Rune Motion configuration system
//!
//! This crate loads playback defaults and logging settings from `rune.toml`,
//! with environment variables as temporary overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "rune.toml";

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuneConfig {
    /// Animation playback defaults
    pub motion: MotionConfig,
    /// Log output settings
    pub logging: LoggingConfig,
}

/// Named timing curves selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingName {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

/// Animation playback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Logical samples per second used when building keyframe tracks
    pub default_fps: u32,
    /// Compositor clock rate in ticks per second
    pub tick_hz: u32,
    /// Default animation duration in seconds
    pub duration: f64,
    /// Default repeat count (0 and 1 both play once)
    pub repeat_count: f64,
    /// Play each cycle forward then backward
    pub autoreverses: bool,
    /// Default timing curve
    pub timing: TimingName,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `rune_motion=debug`
    pub filter: String,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            default_fps: 30,
            tick_hz: 60,
            duration: 1.0,
            repeat_count: 1.0,
            autoreverses: false,
            timing: TimingName::Linear,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl MotionConfig {
    /// Seconds between compositor ticks.
    pub fn tick_interval(&self) -> f64 {
        1.0 / f64::from(self.tick_hz.max(1))
    }
}

impl RuneConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from the default location (rune.toml in the current directory)
    /// or return default configuration if file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file(CONFIG_FILE).unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    /// Values that fail to parse are ignored.
    pub fn merge_with_env(&mut self) {
        if let Ok(val) = std::env::var("RUNE_MOTION_FPS") {
            if let Ok(fps) = val.parse::<u32>() {
                self.motion.default_fps = fps;
            }
        }
        if let Ok(val) = std::env::var("RUNE_MOTION_TICK_HZ") {
            if let Ok(hz) = val.parse::<u32>() {
                self.motion.tick_hz = hz;
            }
        }
        if let Ok(filter) = std::env::var("RUNE_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from rune.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

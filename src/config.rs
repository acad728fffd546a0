//! Configuration for screenpilot
//!
//! Values come from `SCREENPILOT_*` environment variables (a `.env` file is
//! loaded by the binary first) and can be overridden by command-line flags.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::adb::DEFAULT_ADB_ADDR;
use crate::backend::native::DEFAULT_TYPING_DELAY;
use crate::display::DisplaySelector;
use crate::screenshot::DEFAULT_OUTPUT_DIR;

pub const ENV_DISPLAY: &str = "SCREENPILOT_DISPLAY";
pub const ENV_SCALING: &str = "SCREENPILOT_SCALING";
pub const ENV_SCREENSHOT_DELAY_MS: &str = "SCREENPILOT_SCREENSHOT_DELAY_MS";
pub const ENV_ADB_ADDR: &str = "SCREENPILOT_ADB_ADDR";
pub const ENV_OUTPUT_DIR: &str = "SCREENPILOT_OUTPUT_DIR";
pub const ENV_TYPING_DELAY_MS: &str = "SCREENPILOT_TYPING_DELAY_MS";

/// Default pause before the screenshot that follows a shell command
pub const DEFAULT_SCREENSHOT_DELAY: Duration = Duration::from_secs(2);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Which display to bind to
    pub display: DisplaySelector,

    /// Map coordinates through a standard logical frame
    pub scaling_enabled: bool,

    /// Settle delay before a shell screenshot
    pub screenshot_delay: Duration,

    /// ADB server address, host:port
    pub adb_addr: String,

    /// Where screenshots are written
    pub output_dir: PathBuf,

    /// Pause between typed chunks on native displays
    pub typing_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            display: DisplaySelector::Primary,
            scaling_enabled: true,
            screenshot_delay: DEFAULT_SCREENSHOT_DELAY,
            adb_addr: DEFAULT_ADB_ADDR.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            typing_delay: DEFAULT_TYPING_DELAY,
        }
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup, falling back to defaults for unset keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get(ENV_DISPLAY) {
            config.display = value.parse().map_err(|reason| ConfigError::Invalid {
                key: ENV_DISPLAY,
                value: value.clone(),
                reason,
            })?;
        }

        if let Some(value) = get(ENV_SCALING) {
            config.scaling_enabled = parse_bool(&value).ok_or_else(|| ConfigError::Invalid {
                key: ENV_SCALING,
                value: value.clone(),
                reason: "expected true/false, 1/0, yes/no or on/off".to_string(),
            })?;
        }

        if let Some(value) = get(ENV_SCREENSHOT_DELAY_MS) {
            config.screenshot_delay = parse_millis(ENV_SCREENSHOT_DELAY_MS, &value)?;
        }

        if let Some(value) = get(ENV_ADB_ADDR) {
            config.adb_addr = value.trim().to_string();
        }

        if let Some(value) = get(ENV_OUTPUT_DIR) {
            config.output_dir = PathBuf::from(value.trim());
        }

        if let Some(value) = get(ENV_TYPING_DELAY_MS) {
            config.typing_delay = parse_millis(ENV_TYPING_DELAY_MS, &value)?;
        }

        Ok(config)
    }
}

/// Parse a boolean flag value
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_millis(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

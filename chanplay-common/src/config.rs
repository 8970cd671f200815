//! Bootstrap configuration loading and config file resolution
//!
//! Configuration is read once at startup from a TOML file. A missing or broken
//! file never stops the program: it logs a warning and falls back to compiled
//! defaults.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `CHANPLAY_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/chanplay/config.toml`)
//! 4. Compiled defaults (no file)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CHANPLAY_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Folder bundled assets are resolved against (optional)
    ///
    /// When absent, asset names resolve against the working directory.
    #[serde(default)]
    pub assets_root: Option<PathBuf>,

    /// Volume given to newly created channels (0-100)
    #[serde(default = "default_volume")]
    pub default_channel_volume: u8,

    /// Initial loudness of the background player (0-100)
    #[serde(default = "default_volume")]
    pub background_loudness: u8,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Decoder strategy configuration (optional)
    #[serde(default)]
    pub decoder: DecoderConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Decoder strategy selection
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecoderProfile {
    /// Trust the decoder's own completion notification
    Standard,
    /// Arm a completion watchdog for platforms that drop completion notifications
    CompletionWatchdog,
}

/// Decoder configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DecoderConfig {
    /// Which decoder strategy to build at startup
    #[serde(default = "default_profile")]
    pub profile: DecoderProfile,

    /// Extra time the watchdog waits past the expected end before forcing completion
    #[serde(default = "default_watchdog_grace_ms")]
    pub watchdog_grace_ms: u64,
}

fn default_volume() -> u8 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_profile() -> DecoderProfile {
    DecoderProfile::Standard
}

fn default_watchdog_grace_ms() -> u64 {
    250
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            watchdog_grace_ms: default_watchdog_grace_ms(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            assets_root: None,
            default_channel_volume: default_volume(),
            background_loudness: default_volume(),
            logging: LoggingConfig::default(),
            decoder: DecoderConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path, e)))?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file and load it, degrading to defaults on any failure
    pub fn load_or_default(cli_arg: Option<&Path>) -> Self {
        let Some(path) = resolve_config_path(cli_arg) else {
            info!("No config file found, using compiled defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) => {
                warn!("{}; using compiled defaults", e);
                Self::default()
            }
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.default_channel_volume > 100 {
            return Err(Error::Config(format!(
                "default_channel_volume must be 0-100, got {}",
                self.default_channel_volume
            )));
        }
        if self.background_loudness > 100 {
            return Err(Error::Config(format!(
                "background_loudness must be 0-100, got {}",
                self.background_loudness
            )));
        }
        Ok(())
    }
}

/// Find the config file to load, following the documented priority order
///
/// The platform default is only returned when the file exists; explicit paths
/// (CLI or environment) are returned as given so that a typo surfaces as a
/// warning instead of silently falling through.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|p| p.exists())
}

/// Platform config file location (`~/.config/chanplay/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chanplay").join("config.toml"))
}

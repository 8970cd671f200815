//! Configuration management for chanplay
//!
//! Combines the bootstrap TOML file (see `chanplay_common::config`) with
//! command-line overrides, and turns the decoder section into a concrete
//! `DecoderFactory`.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--assets-root, --log-level)
//! 2. Environment variables (CHANPLAY_CONFIG, RUST_LOG)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::audio::clock::ClockDecoderFactory;
use crate::audio::decoder::DecoderFactory;
use crate::audio::watchdog::WatchdogFactory;
use crate::playback::registry::RegistrySettings;
use chanplay_common::config::{DecoderConfig, DecoderProfile, TomlConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Folder bundled assets resolve against
    pub assets_root: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    pub log_level: String,

    /// Registry defaults
    pub registry: RegistrySettings,

    /// Decoder strategy
    pub decoder: DecoderConfig,
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub assets_root: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Config {
    /// Merge bootstrap TOML with command-line overrides
    pub fn from_toml(toml: TomlConfig, overrides: ConfigOverrides) -> Self {
        Self {
            assets_root: overrides.assets_root.or(toml.assets_root),
            log_level: overrides.log_level.unwrap_or(toml.logging.level),
            registry: RegistrySettings {
                default_channel_volume: toml.default_channel_volume.min(100),
                background_loudness: toml.background_loudness.min(100),
            },
            decoder: toml.decoder,
        }
    }

    /// Build the decoder factory selected by `decoder.profile`
    pub fn build_decoder_factory(&self, runtime: Handle) -> Arc<dyn DecoderFactory> {
        let clock: Arc<dyn DecoderFactory> =
            Arc::new(ClockDecoderFactory::new(runtime.clone(), self.assets_root.clone()));

        match self.decoder.profile {
            DecoderProfile::Standard => {
                info!("Decoder strategy: clock");
                clock
            }
            DecoderProfile::CompletionWatchdog => {
                info!(
                    "Decoder strategy: clock with completion watchdog (grace {}ms)",
                    self.decoder.watchdog_grace_ms
                );
                Arc::new(WatchdogFactory::new(
                    clock,
                    runtime,
                    Duration::from_millis(self.decoder.watchdog_grace_ms),
                ))
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), ConfigOverrides::default())
    }
}

//! Daemon configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use keydeck_core::EngineConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Engine tuning
    #[serde(default)]
    pub engine: EngineTuning,
}

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Database path (optional, uses default if not set)
    pub path: Option<PathBuf>,
}

/// Engine tuning knobs exposed through the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineTuning {
    /// Percentage step for active-window volume adjustments
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,
    /// Quiet window for hardware layer-sync notifications, in ms
    #[serde(default = "default_sync_debounce_ms")]
    pub sync_debounce_ms: u64,
    /// OSD highlight duration, in ms
    #[serde(default = "default_osd_highlight_ms")]
    pub osd_highlight_ms: u64,
    /// Maximum ManualDetect candidates
    #[serde(default = "default_candidate_cap")]
    pub candidate_cap: usize,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            volume_step: default_volume_step(),
            sync_debounce_ms: default_sync_debounce_ms(),
            osd_highlight_ms: default_osd_highlight_ms(),
            candidate_cap: default_candidate_cap(),
        }
    }
}

fn default_volume_step() -> u8 {
    2
}

fn default_sync_debounce_ms() -> u64 {
    500
}

fn default_osd_highlight_ms() -> u64 {
    800
}

fn default_candidate_cap() -> usize {
    10
}

impl EngineTuning {
    /// Convert the file-level tuning into the engine's config.
    #[must_use]
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            volume_step: self.volume_step,
            sync_debounce: Duration::from_millis(self.sync_debounce_ms),
            osd_highlight: Duration::from_millis(self.osd_highlight_ms),
            candidate_cap: self.candidate_cap,
            ..EngineConfig::default()
        }
    }
}

/// Load configuration from file or defaults.
pub fn load_config() -> Result<Config> {
    let config_path = config_path()?;

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {config_path:?}"))?;
        Ok(config)
    } else {
        info!(?config_path, "Config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "keydeck", "Keydeck")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.sync_debounce_ms, 500);
        assert_eq!(config.engine.volume_step, 2);
        assert_eq!(config.daemon.log_level, "info");
    }

    #[test]
    fn test_partial_config_overrides() {
        let config: Config = toml::from_str(
            r#"
            [engine]
            sync_debounce_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.sync_debounce_ms, 250);
        assert_eq!(config.engine.candidate_cap, 10);

        let engine = config.engine.to_engine_config();
        assert_eq!(engine.sync_debounce, Duration::from_millis(250));
    }
}

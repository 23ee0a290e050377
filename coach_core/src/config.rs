//! Configuration file support for Custom Coach.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/custom-coach/config.toml`.

use crate::clock::{DEFAULT_MAX_CATCH_UP_TICKS, DEFAULT_POLL_INTERVAL_MS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "custom-coach";

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default)]
    pub voice: VoiceConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    pub fn programs_path(data_dir: &Path) -> PathBuf {
        data_dir.join("programs.json")
    }

    pub fn history_path(data_dir: &Path) -> PathBuf {
        data_dir.join("history.jsonl")
    }
}

/// Guided player configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on ticks applied by one catch-up batch
    #[serde(default = "default_max_catch_up_ticks")]
    pub max_catch_up_ticks: u32,

    /// Length of the get-ready countdown before the first step
    #[serde(default = "default_countdown_seconds")]
    pub countdown_seconds: u32,

    #[serde(default = "default_true")]
    pub announcements: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_catch_up_ticks: default_max_catch_up_ticks(),
            countdown_seconds: default_countdown_seconds(),
            announcements: true,
        }
    }
}

/// Voice coach settings, read by the external voice assistant
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_true")]
    pub coach_enabled: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            coach_enabled: true,
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(APP_DIR)
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_max_catch_up_ticks() -> u32 {
    DEFAULT_MAX_CATCH_UP_TICKS
}

fn default_countdown_seconds() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the player cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.player.poll_interval_ms == 0 || self.player.poll_interval_ms > 1000 {
            return Err(Error::Config(format!(
                "player.poll_interval_ms must be between 1 and 1000, got {}",
                self.player.poll_interval_ms
            )));
        }
        if self.player.max_catch_up_ticks == 0 {
            return Err(Error::Config(
                "player.max_catch_up_ticks must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join(APP_DIR).join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.player.poll_interval_ms, 250);
        assert_eq!(config.player.max_catch_up_ticks, 300);
        assert_eq!(config.player.countdown_seconds, 3);
        assert!(config.player.announcements);
        assert!(config.voice.coach_enabled);
        assert!(config.data.data_dir.ends_with(APP_DIR));
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.player.countdown_seconds = 5;
        config.voice.coach_enabled = false;
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.player.countdown_seconds, 5);
        assert!(!parsed.voice.coach_enabled);
        assert_eq!(parsed.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[player]
max_catch_up_ticks = 60
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.player.max_catch_up_ticks, 60);
        assert_eq!(config.player.poll_interval_ms, 250); // default
        assert!(config.voice.coach_enabled); // default
    }

    #[test]
    fn test_invalid_poll_interval_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[player]\npoll_interval_ms = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}

//! User settings persistence
//!
//! Stores client preferences in ~/.config/laudiolin/settings.json.
//! A missing file means every setting is at its default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default Laudiolin gateway
pub const DEFAULT_GATEWAY: &str = "https://app.seikimo.moe";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchEngine {
    YouTube,
    Spotify,
    #[default]
    All,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSettings {
    pub accuracy: bool,
    pub engine: SearchEngine,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressFill {
    #[default]
    Solid,
    Gradient,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiSettings {
    pub background_color: String,
    pub background_url: String,
    pub progress_fill: ProgressFill,
}

/// Device-level switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Whether the library is mirrored locally and read from disk at startup
    pub offline: bool,
    /// Concurrent units of work while mirroring
    #[serde(default = "default_parallelism")]
    pub download_parallelism: usize,
}

fn default_parallelism() -> usize {
    4
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            offline: false,
            download_parallelism: default_parallelism(),
        }
    }
}

/// Everything persisted in settings.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub ui: UiSettings,
    #[serde(default)]
    pub system: SystemSettings,
    /// Backend base URL
    #[serde(default = "default_gateway")]
    pub gateway: String,
}

fn default_gateway() -> String {
    DEFAULT_GATEWAY.to_string()
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            search: SearchSettings::default(),
            ui: UiSettings::default(),
            system: SystemSettings::default(),
            gateway: default_gateway(),
        }
    }
}

/// Source of the system switches the offline loader consults
pub trait ConfigSource: Send + Sync {
    fn system(&self) -> SystemSettings;
}

impl ConfigSource for SystemSettings {
    fn system(&self) -> SystemSettings {
        self.clone()
    }
}

/// Settings bound to the file they were loaded from
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    pub settings: UserSettings,
}

impl SettingsStore {
    /// Load settings from the default config location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {:?}", path))?;
            let settings: UserSettings =
                serde_json::from_str(&contents).context("Failed to parse settings")?;
            debug!("Loaded settings from {}", path.display());
            settings
        } else {
            debug!("No settings found, using defaults");
            UserSettings::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            settings,
        })
    }

    /// Write settings back to their file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(&self.settings).context("Failed to serialize settings")?;

        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write settings to {:?}", self.path))?;

        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("laudiolin").join("settings.json"))
    }

    /// Default root for mirrored offline data
    pub fn default_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(data_dir.join("laudiolin"))
    }
}

impl ConfigSource for SettingsStore {
    fn system(&self) -> SystemSettings {
        self.settings.system.clone()
    }
}

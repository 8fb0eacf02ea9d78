//! Master sound settings persistence
//!
//! The enabled flag and master volume survive restarts. Values missing from
//! the store fall back to the built-in defaults.
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_ENABLED: bool = true;
pub const DEFAULT_MASTER_VOLUME: f32 = 0.5;

/// Process-wide sound state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasterState {
    pub enabled: bool,

    /// Master volume (0.0-1.0)
    pub master_volume: f32,
}

impl Default for MasterState {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_ENABLED,
            master_volume: DEFAULT_MASTER_VOLUME,
        }
    }
}

/// Stored form; either key may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, rename = "masterVolume", skip_serializing_if = "Option::is_none")]
    pub master_volume: Option<f32>,
}

impl StoredSettings {
    pub fn into_state(self) -> MasterState {
        let defaults = MasterState::default();
        MasterState {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            master_volume: self
                .master_volume
                .filter(|v| v.is_finite())
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(defaults.master_volume),
        }
    }
}

impl From<MasterState> for StoredSettings {
    fn from(state: MasterState) -> Self {
        Self {
            enabled: Some(state.enabled),
            master_volume: Some(state.master_volume),
        }
    }
}

/// Durable key-value store for [`MasterState`]
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<StoredSettings, ConfigError>;
    fn save(&self, state: &MasterState) -> Result<(), ConfigError>;
}

/// JSON file in the platform config directory
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/CouchGuardian/sound-settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("CouchGuardian").join("sound-settings.json"))
    }

    pub fn at_default_location() -> Result<Self, ConfigError> {
        Self::default_path()
            .map(Self::new)
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<StoredSettings, ConfigError> {
        if !self.path.exists() {
            tracing::debug!("No sound settings found, using defaults");
            return Ok(StoredSettings::default());
        }

        let load_failed = |e: Box<dyn std::error::Error + Send + Sync>| ConfigError::LoadFailed {
            path: self.path.display().to_string(),
            source: e,
        };
        let json = std::fs::read_to_string(&self.path).map_err(|e| load_failed(e.into()))?;
        let stored: StoredSettings =
            serde_json::from_str(&json).map_err(|e| load_failed(e.into()))?;

        tracing::debug!("Loaded sound settings from: {}", self.path.display());
        Ok(stored)
    }

    fn save(&self, state: &MasterState) -> Result<(), ConfigError> {
        let save_failed = |e: Box<dyn std::error::Error + Send + Sync>| ConfigError::SaveFailed {
            path: self.path.display().to_string(),
            source: e,
        };

        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.into()))?;
        }

        let json = serde_json::to_string_pretty(&StoredSettings::from(*state))
            .map_err(|e| save_failed(e.into()))?;
        std::fs::write(&self.path, json).map_err(|e| save_failed(e.into()))?;

        tracing::debug!("Saved sound settings to: {}", self.path.display());
        Ok(())
    }
}

/// Non-durable store, for tests and embedders that persist elsewhere
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    stored: Mutex<StoredSettings>,
    saves: Mutex<usize>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stored(stored: StoredSettings) -> Self {
        Self {
            stored: Mutex::new(stored),
            saves: Mutex::new(0),
        }
    }

    pub fn stored(&self) -> StoredSettings {
        self.stored.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<StoredSettings, ConfigError> {
        Ok(self.stored())
    }

    fn save(&self, state: &MasterState) -> Result<(), ConfigError> {
        *self.stored.lock() = StoredSettings::from(*state);
        *self.saves.lock() += 1;
        Ok(())
    }
}

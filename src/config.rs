use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio_system::SoundName;
use crate::error::ConfigError;

fn default_asset_base() -> String {
    ".".to_string()
}

fn default_preload() -> Vec<SoundName> {
    vec![
        SoundName::ButtonClick,
        SoundName::PushPositive,
        SoundName::PushNegative,
    ]
}

fn default_true() -> bool {
    true
}

fn default_note_spacing_ms() -> u64 {
    150
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundConfig {
    /// Directory or http(s) base URL that `sounds/*.mp3` are resolved against
    #[serde(default = "default_asset_base")]
    pub asset_base: String,

    /// Sounds resolved during `init`
    #[serde(default = "default_preload")]
    pub preload: Vec<SoundName>,

    /// Decode assets fully into memory
    #[serde(default = "default_true")]
    pub buffered_decode: bool,

    /// Keep encoded bytes and decode at play time when buffered decoding fails
    #[serde(default = "default_true")]
    pub streaming_fallback: bool,

    /// Generate sounds procedurally when no asset can be used
    #[serde(default = "default_true")]
    pub synthesis_fallback: bool,

    /// Gap between the game-start notes in milliseconds
    #[serde(default = "default_note_spacing_ms")]
    pub note_spacing_ms: u64,

    /// Settings file override; defaults to the platform config directory
    #[serde(default)]
    pub settings_path: Option<PathBuf>,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            asset_base: default_asset_base(),
            preload: default_preload(),
            buffered_decode: true,
            streaming_fallback: true,
            synthesis_fallback: true,
            note_spacing_ms: default_note_spacing_ms(),
            settings_path: None,
        }
    }
}

impl SoundConfig {
    /// Load configuration from the platform-specific config directory.
    /// Creates default config if file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from an explicit path, writing defaults there when absent
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let load_failed = |e: Box<dyn std::error::Error + Send + Sync>| {
                ConfigError::LoadFailed {
                    path: path.display().to_string(),
                    source: e,
                }
            };
            let content = fs::read_to_string(path).map_err(|e| load_failed(e.into()))?;
            let config: SoundConfig =
                serde_json::from_str(&content).map_err(|e| load_failed(e.into()))?;

            tracing::info!("✓ Loaded config from: {}", path.display());
            Ok(config)
        } else {
            // Create default config
            let config = SoundConfig::default();
            config.save_to(path)?;
            tracing::info!("✓ Created default config at: {}", path.display());
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |e: Box<dyn std::error::Error + Send + Sync>| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: e,
        };

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| save_failed(e.into()))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| save_failed(e.into()))?;
        fs::write(path, json).map_err(|e| save_failed(e.into()))?;

        Ok(())
    }

    /// `<config_dir>/CouchGuardian/sound-config.json`
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("CouchGuardian").join("sound-config.json"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn note_spacing(&self) -> Duration {
        Duration::from_millis(self.note_spacing_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SoundConfig::default();
        assert_eq!(config.preload.len(), 3);
        assert!(config.buffered_decode && config.streaming_fallback && config.synthesis_fallback);
        assert_eq!(config.note_spacing(), Duration::from_millis(150));
    }

    #[test]
    fn test_creates_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CouchGuardian").join("sound-config.json");

        let config = SoundConfig::load_from(&path).unwrap();
        assert_eq!(config, SoundConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sound-config.json");
        fs::write(
            &path,
            r#"{ "asset_base": "https://cdn.example.com/cg", "preload": ["ambient"], "streaming_fallback": false }"#,
        )
        .unwrap();

        let config = SoundConfig::load_from(&path).unwrap();
        assert_eq!(config.asset_base, "https://cdn.example.com/cg");
        assert_eq!(config.preload, vec![SoundName::Ambient]);
        assert!(!config.streaming_fallback);
        assert!(config.buffered_decode);
        assert_eq!(config.note_spacing_ms, 150);
    }

    #[test]
    fn test_unknown_sound_in_preload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sound-config.json");
        fs::write(&path, r#"{ "preload": ["kazoo"] }"#).unwrap();

        assert!(matches!(
            SoundConfig::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sound-config.json");
        let config = SoundConfig {
            note_spacing_ms: 90,
            settings_path: Some(dir.path().join("settings.json")),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(SoundConfig::load_from(&path).unwrap(), config);
    }
}

//! Sound definitions
//!
//! The closed table of sounds the game knows about, with their asset
//! locators, categories and default playback parameters.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::params::PlaybackParams;
use crate::error::SoundError;

/// Symbolic sound names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundName {
    /// Push that gained points
    PushPositive,

    /// Push that lost points
    PushNegative,

    /// Cursed push
    Cursed,

    LevelUp,
    GameStart,
    ButtonClick,
    Notification,

    /// Looping background texture
    Ambient,
}

impl SoundName {
    pub const ALL: [SoundName; 8] = [
        SoundName::PushPositive,
        SoundName::PushNegative,
        SoundName::Cursed,
        SoundName::LevelUp,
        SoundName::GameStart,
        SoundName::ButtonClick,
        SoundName::Notification,
        SoundName::Ambient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoundName::PushPositive => "push-positive",
            SoundName::PushNegative => "push-negative",
            SoundName::Cursed => "cursed",
            SoundName::LevelUp => "level-up",
            SoundName::GameStart => "game-start",
            SoundName::ButtonClick => "button-click",
            SoundName::Notification => "notification",
            SoundName::Ambient => "ambient",
        }
    }

    /// Look up the immutable definition for this sound
    pub fn definition(&self) -> SoundDefinition {
        let (category, volume, pitch) = match self {
            SoundName::PushPositive => (SoundCategory::Effect, 0.6, 1.0),
            SoundName::PushNegative => (SoundCategory::Effect, 0.7, 0.8),
            SoundName::Cursed => (SoundCategory::Effect, 0.8, 0.7),
            SoundName::LevelUp => (SoundCategory::Effect, 0.6, 1.2),
            SoundName::GameStart => (SoundCategory::Effect, 0.7, 1.0),
            SoundName::ButtonClick => (SoundCategory::Ui, 0.4, 1.0),
            SoundName::Notification => (SoundCategory::Ui, 0.5, 1.0),
            SoundName::Ambient => (SoundCategory::Background, 0.3, 1.0),
        };

        SoundDefinition {
            name: *self,
            locator: format!("sounds/{}.mp3", self.as_str()),
            category,
            defaults: PlaybackParams {
                volume,
                pitch,
                pan: 0.0,
                looped: category == SoundCategory::Background,
            },
        }
    }
}

impl fmt::Display for SoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundName {
    type Err = SoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| SoundError::UnknownSound(s.to_string()))
    }
}

/// Sound categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCategory {
    Effect,
    Ui,
    Background,
}

impl fmt::Display for SoundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundCategory::Effect => write!(f, "effect"),
            SoundCategory::Ui => write!(f, "ui"),
            SoundCategory::Background => write!(f, "background"),
        }
    }
}

/// Immutable description of a known sound
#[derive(Debug, Clone, PartialEq)]
pub struct SoundDefinition {
    pub name: SoundName,

    /// Asset location, relative to the configured asset base
    pub locator: String,

    pub category: SoundCategory,

    pub defaults: PlaybackParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sound_name_display() {
        assert_eq!(SoundName::PushPositive.to_string(), "push-positive");
        assert_eq!(SoundName::ButtonClick.to_string(), "button-click");
    }

    #[test]
    fn test_sound_name_parse() {
        for name in SoundName::ALL {
            assert_eq!(name.as_str().parse::<SoundName>().unwrap(), name);
        }
        assert!(matches!(
            "kazoo".parse::<SoundName>(),
            Err(SoundError::UnknownSound(s)) if s == "kazoo"
        ));
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&SoundName::LevelUp).unwrap();
        assert_eq!(json, "\"level-up\"");
    }

    #[test]
    fn test_definitions() {
        let cursed = SoundName::Cursed.definition();
        assert_eq!(cursed.locator, "sounds/cursed.mp3");
        assert_eq!(cursed.category, SoundCategory::Effect);
        assert_eq!(cursed.defaults.volume, 0.8);
        assert_eq!(cursed.defaults.pitch, 0.7);

        let ambient = SoundName::Ambient.definition();
        assert_eq!(ambient.category, SoundCategory::Background);
        assert!(ambient.defaults.looped);

        assert_eq!(SoundName::Notification.definition().category, SoundCategory::Ui);
        assert!(!SoundName::Notification.definition().defaults.looped);
    }
}

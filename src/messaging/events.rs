/// Sound event types
///
/// Things that happened in the game or its UI that may deserve audible
/// feedback. Publishers never know which sound, if any, they trigger.
use std::fmt;
use std::str::FromStr;

use crate::audio_system::SoundName;
use crate::error::SoundError;

/// Controls whose invocation clicks like a button
pub const CLICKING_CONTROLS: [&str; 4] = ["startGame", "togglePause", "selectCharacter", "shareGame"];

/// Events published on the sound bus
#[derive(Debug, Clone, PartialEq)]
pub enum SoundEvent {
    /// A named game moment
    Game(GameEvent),

    /// A push resolved; `delta` is the score change
    Push { delta: f32, cursed: bool },

    /// Something happened in the UI layer
    Ui(UiAction),
}

/// Game moments with a fixed sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameEvent {
    GameStart,
    LevelUp,
    Notification,
    ButtonClick,
    CursedPush,
}

impl GameEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameEvent::GameStart => "game_start",
            GameEvent::LevelUp => "level_up",
            GameEvent::Notification => "notification",
            GameEvent::ButtonClick => "button_click",
            GameEvent::CursedPush => "cursed_push",
        }
    }

    pub fn sound(&self) -> SoundName {
        match self {
            GameEvent::GameStart => SoundName::GameStart,
            GameEvent::LevelUp => SoundName::LevelUp,
            GameEvent::Notification => SoundName::Notification,
            GameEvent::ButtonClick => SoundName::ButtonClick,
            GameEvent::CursedPush => SoundName::Cursed,
        }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GameEvent {
    type Err = SoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "game_start" => Ok(GameEvent::GameStart),
            "level_up" => Ok(GameEvent::LevelUp),
            "notification" => Ok(GameEvent::Notification),
            "button_click" => Ok(GameEvent::ButtonClick),
            "cursed_push" => Ok(GameEvent::CursedPush),
            other => Err(SoundError::UnknownSound(other.to_string())),
        }
    }
}

/// UI interactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// Any button was pressed
    ButtonPressed,

    /// A named game control ran, e.g. `startGame`
    ControlInvoked(String),

    /// A notification became visible
    NotificationShown,
}

impl UiAction {
    /// Sound to play for this action, if any
    pub fn sound(&self) -> Option<SoundName> {
        match self {
            UiAction::ButtonPressed => Some(SoundName::ButtonClick),
            UiAction::ControlInvoked(name) if CLICKING_CONTROLS.contains(&name.as_str()) => {
                Some(SoundName::ButtonClick)
            }
            UiAction::ControlInvoked(_) => None,
            UiAction::NotificationShown => Some(SoundName::Notification),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_event_names() {
        for event in [
            GameEvent::GameStart,
            GameEvent::LevelUp,
            GameEvent::Notification,
            GameEvent::ButtonClick,
            GameEvent::CursedPush,
        ] {
            assert_eq!(event.as_str().parse::<GameEvent>().unwrap(), event);
        }
        assert!("victory_lap".parse::<GameEvent>().is_err());
    }

    #[test]
    fn test_cursed_push_plays_cursed() {
        assert_eq!(GameEvent::CursedPush.sound(), SoundName::Cursed);
    }

    #[test]
    fn test_ui_action_sounds() {
        assert_eq!(UiAction::ButtonPressed.sound(), Some(SoundName::ButtonClick));
        assert_eq!(
            UiAction::ControlInvoked("togglePause".to_string()).sound(),
            Some(SoundName::ButtonClick)
        );
        assert_eq!(UiAction::ControlInvoked("openMenu".to_string()).sound(), None);
        assert_eq!(UiAction::NotificationShown.sound(), Some(SoundName::Notification));
    }
}

use thiserror::Error;

/// Sound-system errors using thiserror for structured error handling.
///
/// None of these are fatal to the host game: the façade logs them and
/// degrades to silence. They surface directly only from the lower-level
/// building blocks (synthesizer, decoder, asset sources).
#[derive(Error, Debug)]
pub enum SoundError {
    #[error("No audio output device available")]
    CapabilityUnavailable,

    #[error("Failed to fetch audio asset: {locator}")]
    AssetFetchFailed {
        locator: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to decode audio asset: {locator}")]
    AssetDecodeFailed {
        locator: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Unknown sound: {0}")]
    UnknownSound(String),

    #[error("Audio output rejected playback")]
    PlaybackTransientFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Invalid duration {duration}s (must exceed the {attack}s attack)")]
    InvalidDuration { duration: f32, attack: f32 },

    #[error("Invalid frequency {0} Hz")]
    InvalidFrequency(f64),

    #[error("No backend could resolve sound: {0}")]
    Unresolvable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Could not determine the platform config directory")]
    NoConfigDir,
}

impl SoundError {
    pub(crate) fn fetch(
        locator: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        SoundError::AssetFetchFailed {
            locator: locator.into(),
            source: source.into(),
        }
    }

    pub(crate) fn decode(
        locator: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        SoundError::AssetDecodeFailed {
            locator: locator.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = SoundError::UnknownSound("boing".to_string());
        assert_eq!(err.to_string(), "Unknown sound: boing");

        let err = SoundError::CapabilityUnavailable;
        assert_eq!(err.to_string(), "No audio output device available");
    }

    #[test]
    fn test_error_source_chain() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = SoundError::fetch("sounds/cursed.mp3", io_err);

        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "Failed to fetch audio asset: sounds/cursed.mp3"
        );
    }
}

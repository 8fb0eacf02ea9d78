//! Couch Guardian sound effects
//!
//! Procedural sound synthesis and a playback façade that falls back from
//! decoded assets to streamed assets to synthesized sound.

pub mod assets;
pub mod audio_system;
pub mod config;
pub mod error;
pub mod messaging;
pub mod settings;
pub mod synth;

pub use assets::{AssetSource, FileAssetSource, HttpAssetSource, MemoryAssetSource};
pub use audio_system::{
    Backend, HeadlessOutput, ParamOverrides, PlaybackHandle, RodioOutput, SoundName, SoundSystem,
};
pub use config::SoundConfig;
pub use error::{ConfigError, SoundError};
pub use messaging::{GameEvent, SoundBus, SoundEvent, UiAction};
pub use settings::{JsonSettingsStore, MasterState, MemorySettingsStore, SettingsStore};
pub use synth::Synthesizer;

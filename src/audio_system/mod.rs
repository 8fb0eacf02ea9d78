pub mod decode;
pub mod handle;
pub mod headless;
pub mod manager;
pub mod output;
pub mod params;
pub mod pcm;
pub mod resolver;
/// Audio system module
///
/// Provides the playback side of the game's sound feedback:
/// - A closed table of named sounds with default parameters
/// - Per-name resolution to a backend, deduplicated across threads
/// - Uniform playback handles with stop/volume/pitch control
/// - Master volume and enable state shared by every live sound
///
/// ## Architecture
///
/// ```text
/// SoundSystem
///   ├── ResolutionCache   name → Buffered | Streaming | Synthesized
///   ├── AssetSource       directory, HTTP or memory
///   ├── Synthesizer       procedural fallback
///   └── AudioOutput       rodio device or headless
///
/// play(name)
///   └── cache hit  → merged params → voice → PlaybackHandle
///       cache miss → background resolve → play once
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// use audio_system::{ParamOverrides, RodioOutput, SoundName, SoundSystem};
///
/// let output = Arc::new(RodioOutput::new()?);
/// let sounds = SoundSystem::builder(SoundConfig::load()?)
///     .with_output(output)
///     .build();
/// sounds.init();
///
/// // Defaults from the sound table
/// sounds.play(SoundName::ButtonClick, ParamOverrides::none());
///
/// // Per-call overrides
/// let handle = sounds.play(SoundName::LevelUp, ParamOverrides::none().with_pan(-0.4));
/// ```
pub mod source;

// Re-export commonly used types
pub use handle::PlaybackHandle;
pub use headless::HeadlessOutput;
pub use manager::{push_sound, BusListener, SoundSystem, SoundSystemBuilder};
pub use output::{AudioOutput, ContextState, RodioOutput, Voice, VoiceSettings};
pub use params::{effective_volume, ParamOverrides, PlaybackParams};
pub use pcm::PcmBuffer;
pub use resolver::{Backend, ResolutionState};
pub use source::{SoundCategory, SoundDefinition, SoundName};

//! Procedural sound synthesis
//!
//! Generates every game sound from oscillators and noise so the game still
//! has feedback when no audio assets can be loaded.
//!
//! ```text
//! Synthesizer
//!   ├── Tone      oscillator → envelope
//!   ├── Layered   oscillators (swept) → summed → envelope
//!   ├── Pink      white noise → Kellet filter → gain (looping)
//!   └── Arpeggio  Sequence of tones on a timer thread
//! ```
//!
//! All effects are rendered to PCM up front and played through the shared
//! [`AudioOutput`]. Pitch is fixed by the patch; the returned voices ignore
//! speed changes.
pub mod envelope;
pub mod noise;
pub mod oscillator;
pub mod presets;
pub mod render;
pub mod sequence;

use std::sync::Arc;
use std::time::Duration;

use crate::audio_system::output::{AudioOutput, ContextState, Voice, VoiceSettings};
use crate::audio_system::pcm::PcmBuffer;
use crate::audio_system::SoundName;
use crate::error::SoundError;

pub use envelope::Envelope;
pub use oscillator::Waveform;
pub use presets::Patch;
pub use sequence::Sequence;

pub struct Synthesizer {
    output: Arc<dyn AudioOutput>,
    sample_rate: u32,
    note_spacing: Duration,
}

impl Synthesizer {
    /// Fails with [`SoundError::CapabilityUnavailable`] when the output has
    /// no device behind it
    pub fn new(output: Arc<dyn AudioOutput>) -> Result<Self, SoundError> {
        if !output.is_available() {
            return Err(SoundError::CapabilityUnavailable);
        }
        let sample_rate = output.sample_rate();
        tracing::debug!("Synthesizer ready at {} Hz", sample_rate);

        Ok(Self {
            output,
            sample_rate,
            note_spacing: presets::GAME_START_SPACING,
        })
    }

    /// Gap between game-start notes
    pub fn with_note_spacing(mut self, spacing: Duration) -> Self {
        self.note_spacing = spacing;
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn patch(&self, name: SoundName) -> Patch {
        presets::patch_for(name, self.note_spacing)
    }

    /// Render a sound to a single buffer without playing it
    pub fn render(&self, name: SoundName) -> Result<PcmBuffer, SoundError> {
        render::patch(&self.patch(name), self.sample_rate, &mut rand::thread_rng())
    }

    pub fn tone(
        &self,
        frequency: f64,
        duration: f32,
        waveform: Waveform,
        volume: f32,
    ) -> Result<Arc<dyn Voice>, SoundError> {
        let buffer = render::simple_tone(frequency, duration, waveform, volume, self.sample_rate)?;
        self.start_buffer(&buffer, false, VoiceSettings::default())
    }

    pub fn noise(&self, duration: f32, volume: f32) -> Result<Arc<dyn Voice>, SoundError> {
        let buffer = render::noise(duration, volume, self.sample_rate, &mut rand::thread_rng())?;
        self.start_buffer(&buffer, false, VoiceSettings::default())
    }

    pub fn pink_noise(&self, duration: f32, looped: bool) -> Result<Arc<dyn Voice>, SoundError> {
        let patch = Patch::Pink {
            duration,
            gain: presets::AMBIENT_GAIN,
            looped,
        };
        self.play_patch(&patch, VoiceSettings::default(), None)
    }

    pub fn cursed(&self) -> Result<Arc<dyn Voice>, SoundError> {
        self.play(SoundName::Cursed, VoiceSettings::default())
    }

    pub fn level_up(&self) -> Result<Arc<dyn Voice>, SoundError> {
        self.play(SoundName::LevelUp, VoiceSettings::default())
    }

    /// Cancellable C-E-G arpeggio
    pub fn game_start(&self) -> Result<Arc<dyn Voice>, SoundError> {
        self.play(SoundName::GameStart, VoiceSettings::default())
    }

    pub fn button_click(&self) -> Result<Arc<dyn Voice>, SoundError> {
        self.play(SoundName::ButtonClick, VoiceSettings::default())
    }

    pub fn notification(&self) -> Result<Arc<dyn Voice>, SoundError> {
        self.play(SoundName::Notification, VoiceSettings::default())
    }

    pub fn push_positive(&self) -> Result<Arc<dyn Voice>, SoundError> {
        self.play(SoundName::PushPositive, VoiceSettings::default())
    }

    pub fn push_negative(&self) -> Result<Arc<dyn Voice>, SoundError> {
        self.play(SoundName::PushNegative, VoiceSettings::default())
    }

    pub fn ambient(&self) -> Result<Arc<dyn Voice>, SoundError> {
        self.play(SoundName::Ambient, VoiceSettings::default())
    }

    /// Play the generator for `name`. `settings.volume` scales the patch's
    /// own level; `settings.speed` is ignored.
    pub fn play(&self, name: SoundName, settings: VoiceSettings) -> Result<Arc<dyn Voice>, SoundError> {
        self.play_patch(&self.patch(name), settings, None)
    }

    /// Like [`Synthesizer::play`], but loops when `looped` is set and plays
    /// once otherwise, whatever the patch does by default. A looped
    /// arpeggio repeats its mixdown.
    pub fn play_looping(
        &self,
        name: SoundName,
        settings: VoiceSettings,
        looped: bool,
    ) -> Result<Arc<dyn Voice>, SoundError> {
        self.play_patch(&self.patch(name), settings, Some(looped))
    }

    fn play_patch(
        &self,
        patch: &Patch,
        settings: VoiceSettings,
        looped: Option<bool>,
    ) -> Result<Arc<dyn Voice>, SoundError> {
        let settings = VoiceSettings {
            speed: 1.0,
            ..settings
        };

        match patch {
            Patch::Arpeggio { notes, spacing } if looped != Some(true) => {
                self.ensure_running()?;
                let steps = notes
                    .iter()
                    .map(|note| render::tone(note, self.sample_rate))
                    .collect::<Result<Vec<_>, _>>()?;
                let sequence: Arc<dyn Voice> =
                    Sequence::start(Arc::clone(&self.output), steps, *spacing, settings)?;
                Ok(sequence)
            }
            Patch::Pink { looped: natural, .. } => {
                let buffer = render::patch(patch, self.sample_rate, &mut rand::thread_rng())?;
                self.start_buffer(&buffer, looped.unwrap_or(*natural), settings)
            }
            _ => {
                let buffer = render::patch(patch, self.sample_rate, &mut rand::thread_rng())?;
                self.start_buffer(&buffer, looped.unwrap_or(false), settings)
            }
        }
    }

    fn start_buffer(
        &self,
        buffer: &PcmBuffer,
        looped: bool,
        settings: VoiceSettings,
    ) -> Result<Arc<dyn Voice>, SoundError> {
        self.ensure_running()?;
        let source = if looped {
            buffer.looped_source()
        } else {
            buffer.source()
        };
        self.output.start(Box::new(source), settings)
    }

    /// Resume a suspended output on first use
    fn ensure_running(&self) -> Result<(), SoundError> {
        if self.output.state() == ContextState::Suspended {
            self.output.resume()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::headless::HeadlessOutput;

    fn synth() -> (Arc<HeadlessOutput>, Synthesizer) {
        let output = Arc::new(HeadlessOutput::with_sample_rate(8_000));
        let synth = Synthesizer::new(output.clone()).unwrap();
        (output, synth)
    }

    #[test]
    fn test_unavailable_output_fails_construction() {
        let output = Arc::new(HeadlessOutput::unavailable());
        assert!(matches!(
            Synthesizer::new(output),
            Err(SoundError::CapabilityUnavailable)
        ));
    }

    #[test]
    fn test_first_play_resumes_output() {
        let (output, synth) = synth();
        assert_eq!(output.state(), ContextState::Suspended);

        synth.button_click().unwrap();
        assert_eq!(output.state(), ContextState::Running);
        assert_eq!(output.resume_count(), 1);

        synth.notification().unwrap();
        assert_eq!(output.resume_count(), 1);
    }

    #[test]
    fn test_tone_voice_duration() {
        let (output, synth) = synth();
        synth.tone(440.0, 0.5, Waveform::Sine, 0.5).unwrap();
        let voice = &output.voices()[0];
        assert_eq!(voice.duration(), Some(Duration::from_millis(500)));
        assert_eq!(voice.sample_rate(), 8_000);
    }

    #[test]
    fn test_tone_rejects_short_duration() {
        let (output, synth) = synth();
        assert!(synth.tone(440.0, 0.01, Waveform::Square, 0.5).is_err());
        assert_eq!(output.started_count(), 0);
    }

    #[test]
    fn test_tone_rejects_nan_frequency() {
        let (output, synth) = synth();
        assert!(matches!(
            synth.tone(f64::NAN, 0.5, Waveform::Sine, 0.5),
            Err(SoundError::InvalidFrequency(_))
        ));
        assert_eq!(output.started_count(), 0);
    }

    #[test]
    fn test_ambient_loops() {
        let (output, synth) = synth();
        synth.ambient().unwrap();
        assert_eq!(output.voices()[0].duration(), None);

        synth.pink_noise(1.0, false).unwrap();
        assert_eq!(output.voices()[1].duration(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_play_looping_overrides_patch() {
        let (output, synth) = synth();
        synth
            .play_looping(SoundName::Ambient, VoiceSettings::default(), false)
            .unwrap();
        assert_eq!(output.voices()[0].duration(), Some(Duration::from_secs(2)));

        synth
            .play_looping(SoundName::ButtonClick, VoiceSettings::default(), true)
            .unwrap();
        assert_eq!(output.voices()[1].duration(), None);
    }

    #[test]
    fn test_looped_game_start_repeats_mixdown() {
        let (output, synth) = synth();
        let voice = synth
            .play_looping(SoundName::GameStart, VoiceSettings::default(), true)
            .unwrap();
        assert_eq!(output.started_count(), 1);
        assert_eq!(output.voices()[0].duration(), None);

        voice.stop();
        assert!(voice.is_finished());
    }

    #[test]
    fn test_play_ignores_speed() {
        let (output, synth) = synth();
        let settings = VoiceSettings {
            volume: 0.3,
            speed: 2.0,
            pan: -0.5,
        };
        synth.play(SoundName::LevelUp, settings).unwrap();

        let recorded = output.voices()[0].settings();
        assert_eq!(recorded.speed, 1.0);
        assert_eq!(recorded.volume, 0.3);
        assert_eq!(recorded.pan, -0.5);
    }

    #[test]
    fn test_game_start_can_be_cancelled() {
        let (output, synth) = synth();
        let synth = synth.with_note_spacing(Duration::from_secs(30));
        let voice = synth.game_start().unwrap();
        assert_eq!(output.started_count(), 1);

        voice.stop();
        assert!(voice.is_finished());
        assert_eq!(output.started_count(), 1);
    }

    #[test]
    fn test_render_every_sound() {
        let (_output, synth) = synth();
        for name in SoundName::ALL {
            let buffer = synth.render(name).unwrap();
            assert!(!buffer.samples().is_empty(), "{name} rendered empty");
            assert!(buffer.samples().iter().all(|s| s.abs() <= 1.0));
        }
    }
}

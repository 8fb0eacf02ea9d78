//! Effect recipes
//!
//! Each known sound maps to one patch. Patches are plain data; rendering
//! them into samples happens in [`super::render`].
use std::time::Duration;

use super::oscillator::{FrequencySweep, Waveform};
use crate::audio_system::SoundName;

/// One oscillator in a layered patch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    pub waveform: Waveform,
    pub sweep: FrequencySweep,
}

/// A single short tone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub frequency: f64,
    pub duration: f32,
    pub waveform: Waveform,
    pub volume: f32,
}

impl ToneSpec {
    pub const fn new(frequency: f64, duration: f32, waveform: Waveform, volume: f32) -> Self {
        Self {
            frequency,
            duration,
            waveform,
            volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Tone(ToneSpec),

    /// Several oscillators summed into one gain stage
    Layered {
        layers: Vec<Layer>,
        attack: f32,
        peak: f32,
        duration: f32,
    },

    /// Pink noise, optionally looping
    Pink {
        duration: f32,
        gain: f32,
        looped: bool,
    },

    /// Independent tones started `spacing` apart
    Arpeggio {
        notes: Vec<ToneSpec>,
        spacing: Duration,
    },
}

#[cfg(test)]
impl Patch {
    /// Longest time the patch can sound, `None` when it loops
    pub fn length(&self) -> Option<Duration> {
        fn seconds(value: f32) -> Duration {
            Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::MAX)
        }

        match self {
            Patch::Tone(tone) => Some(seconds(tone.duration)),
            Patch::Layered { duration, .. } => Some(seconds(*duration)),
            Patch::Pink { looped: true, .. } => None,
            Patch::Pink { duration, .. } => Some(seconds(*duration)),
            Patch::Arpeggio { notes, spacing } => {
                let last = notes.len().saturating_sub(1) as u32;
                let tail = notes.last().map(|n| n.duration).unwrap_or(0.0);
                Some(spacing.saturating_mul(last).saturating_add(seconds(tail)))
            }
        }
    }
}

pub const GAME_START_NOTES: [f64; 3] = [523.25, 659.25, 783.99];
pub const GAME_START_SPACING: Duration = Duration::from_millis(150);
pub const AMBIENT_GAIN: f32 = 0.1;
pub const AMBIENT_SECONDS: f32 = 2.0;

pub const PUSH_POSITIVE: ToneSpec = ToneSpec::new(800.0, 0.2, Waveform::Sine, 0.4);
pub const PUSH_NEGATIVE: ToneSpec = ToneSpec::new(300.0, 0.3, Waveform::Sawtooth, 0.5);
pub const BUTTON_CLICK: ToneSpec = ToneSpec::new(1000.0, 0.05, Waveform::Square, 0.3);
pub const NOTIFICATION: ToneSpec = ToneSpec::new(1200.0, 0.1, Waveform::Sine, 0.4);

pub fn cursed() -> Patch {
    Patch::Layered {
        layers: vec![
            Layer {
                waveform: Waveform::Square,
                sweep: FrequencySweep::new(200.0, 50.0, 0.5),
            },
            Layer {
                waveform: Waveform::Sawtooth,
                sweep: FrequencySweep::new(150.0, 100.0, 0.5),
            },
        ],
        attack: 0.05,
        peak: 0.6,
        duration: 0.5,
    }
}

pub fn level_up() -> Patch {
    Patch::Layered {
        layers: vec![Layer {
            waveform: Waveform::Sine,
            sweep: FrequencySweep::new(400.0, 800.0, 0.3),
        }],
        attack: 0.05,
        peak: 0.5,
        duration: 0.3,
    }
}

pub fn game_start(spacing: Duration) -> Patch {
    Patch::Arpeggio {
        notes: GAME_START_NOTES
            .iter()
            .map(|&f| ToneSpec::new(f, 0.15, Waveform::Sine, 0.4))
            .collect(),
        spacing,
    }
}

pub fn ambient() -> Patch {
    Patch::Pink {
        duration: AMBIENT_SECONDS,
        gain: AMBIENT_GAIN,
        looped: true,
    }
}

/// The generator for a sound name
pub fn patch_for(name: SoundName, spacing: Duration) -> Patch {
    match name {
        SoundName::PushPositive => Patch::Tone(PUSH_POSITIVE),
        SoundName::PushNegative => Patch::Tone(PUSH_NEGATIVE),
        SoundName::Cursed => cursed(),
        SoundName::LevelUp => level_up(),
        SoundName::GameStart => game_start(spacing),
        SoundName::ButtonClick => Patch::Tone(BUTTON_CLICK),
        SoundName::Notification => Patch::Tone(NOTIFICATION),
        SoundName::Ambient => ambient(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::envelope::STANDARD_ATTACK;

    #[test]
    fn test_every_sound_has_a_patch() {
        for name in SoundName::ALL {
            let patch = patch_for(name, GAME_START_SPACING);
            if name == SoundName::Ambient {
                assert_eq!(patch.length(), None);
            } else {
                assert!(patch.length().is_some(), "{name} should end");
            }
        }
    }

    #[test]
    fn test_length_tolerates_bad_durations() {
        let nan = Patch::Tone(ToneSpec::new(440.0, f32::NAN, Waveform::Sine, 0.5));
        assert_eq!(nan.length(), Some(Duration::ZERO));

        let negative = Patch::Pink {
            duration: -1.0,
            gain: AMBIENT_GAIN,
            looped: false,
        };
        assert_eq!(negative.length(), Some(Duration::ZERO));

        let endless = Patch::Layered {
            layers: Vec::new(),
            attack: 0.01,
            peak: 0.5,
            duration: f32::INFINITY,
        };
        assert_eq!(endless.length(), Some(Duration::MAX));
    }

    #[test]
    fn test_game_start_is_a_major_triad() {
        match game_start(GAME_START_SPACING) {
            Patch::Arpeggio { notes, spacing } => {
                let freqs: Vec<f64> = notes.iter().map(|n| n.frequency).collect();
                assert_eq!(freqs, vec![523.25, 659.25, 783.99]);
                assert_eq!(spacing, Duration::from_millis(150));
            }
            other => panic!("unexpected patch {other:?}"),
        }
        let length = game_start(GAME_START_SPACING).length().unwrap();
        assert_eq!(length.as_millis(), 450);
    }

    #[test]
    fn test_cursed_layers() {
        match cursed() {
            Patch::Layered { layers, .. } => {
                assert_eq!(layers[0].waveform, Waveform::Square);
                assert_eq!(layers[0].sweep, FrequencySweep::new(200.0, 50.0, 0.5));
                assert_eq!(layers[1].waveform, Waveform::Sawtooth);
                assert_eq!(layers[1].sweep, FrequencySweep::new(150.0, 100.0, 0.5));
            }
            other => panic!("unexpected patch {other:?}"),
        }
    }

    #[test]
    fn test_tone_presets_fit_their_attack() {
        for tone in [PUSH_POSITIVE, PUSH_NEGATIVE, BUTTON_CLICK, NOTIFICATION] {
            assert!(tone.duration > STANDARD_ATTACK);
        }
    }
}

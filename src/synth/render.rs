//! Offline rendering of patches into mono PCM.

use rand::Rng;

use super::envelope::Envelope;
use super::noise;
use super::oscillator::{FrequencySweep, Oscillator, Waveform};
use super::presets::{Layer, Patch, ToneSpec};
use crate::audio_system::pcm::PcmBuffer;
use crate::error::SoundError;

fn sample_count(sample_rate: u32, seconds: f32) -> usize {
    (sample_rate as f64 * seconds.max(0.0) as f64) as usize
}

/// Sum `layers` under `envelope`, hard-clipped to [-1, 1]
pub fn layers(layers: &[Layer], envelope: &Envelope, sample_rate: u32) -> PcmBuffer {
    let mut oscillators: Vec<(Oscillator, FrequencySweep)> = layers
        .iter()
        .map(|l| (Oscillator::new(l.waveform, sample_rate), l.sweep))
        .collect();

    let rate = sample_rate as f64;
    let samples = (0..sample_count(sample_rate, envelope.duration))
        .map(|i| {
            let t = i as f64 / rate;
            let sum: f32 = oscillators
                .iter_mut()
                .map(|(osc, sweep)| osc.next_sample(sweep.at(t)))
                .sum();
            (sum * envelope.gain_at(t as f32)).clamp(-1.0, 1.0)
        })
        .collect();

    PcmBuffer::mono(sample_rate, samples)
}

pub fn tone(spec: &ToneSpec, sample_rate: u32) -> Result<PcmBuffer, SoundError> {
    let sweep = FrequencySweep::constant(spec.frequency);
    sweep.validate()?;
    let envelope = Envelope::standard(spec.volume, spec.duration)?;
    let layer = Layer {
        waveform: spec.waveform,
        sweep,
    };
    Ok(layers(&[layer], &envelope, sample_rate))
}

/// White noise under the standard envelope
pub fn noise<R: Rng + ?Sized>(
    duration: f32,
    volume: f32,
    sample_rate: u32,
    rng: &mut R,
) -> Result<PcmBuffer, SoundError> {
    let envelope = Envelope::standard(volume, duration)?;
    let rate = sample_rate as f32;
    let samples = (0..sample_count(sample_rate, duration))
        .map(|i| noise::white(rng) * envelope.gain_at(i as f32 / rate))
        .collect();
    Ok(PcmBuffer::mono(sample_rate, samples))
}

pub fn pink<R: Rng + ?Sized>(
    duration: f32,
    gain: f32,
    sample_rate: u32,
    rng: &mut R,
) -> PcmBuffer {
    let whites: Vec<f32> = (0..sample_count(sample_rate, duration))
        .map(|_| noise::white(rng))
        .collect();
    PcmBuffer::mono(sample_rate, noise::pink(whites, gain))
}

/// Render any patch into a single buffer. Arpeggio notes are mixed at their
/// offsets; looping pink noise renders one loop period.
pub fn patch<R: Rng + ?Sized>(
    patch: &Patch,
    sample_rate: u32,
    rng: &mut R,
) -> Result<PcmBuffer, SoundError> {
    match patch {
        Patch::Tone(spec) => tone(spec, sample_rate),
        Patch::Layered {
            layers: oscillators,
            attack,
            peak,
            duration,
        } => {
            for layer in oscillators {
                layer.sweep.validate()?;
            }
            let envelope = Envelope::new(*attack, *peak, *duration)?;
            Ok(layers(oscillators, &envelope, sample_rate))
        }
        Patch::Pink { duration, gain, .. } => Ok(pink(*duration, *gain, sample_rate, rng)),
        Patch::Arpeggio { notes, spacing } => {
            let step = sample_count(sample_rate, spacing.as_secs_f32());
            let mut mixed = PcmBuffer::mono(sample_rate, Vec::new());
            for (i, note) in notes.iter().enumerate() {
                mixed = mixed.mix_at(&tone(note, sample_rate)?, i * step);
            }
            Ok(mixed)
        }
    }
}

/// Convenience for callers that only need a single waveform
pub fn simple_tone(
    frequency: f64,
    duration: f32,
    waveform: Waveform,
    volume: f32,
    sample_rate: u32,
) -> Result<PcmBuffer, SoundError> {
    tone(&ToneSpec::new(frequency, duration, waveform, volume), sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::presets;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    const RATE: u32 = 8_000;

    fn peak(buffer: &PcmBuffer) -> f32 {
        buffer.samples().iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_tone_length_and_peak() {
        let buffer = tone(&presets::BUTTON_CLICK, RATE).unwrap();
        assert_eq!(buffer.samples().len(), 400);
        assert_eq!(buffer.samples()[0], 0.0);
        assert!(peak(&buffer) <= 0.3 + 1e-6);
        assert!(peak(&buffer) > 0.25);
    }

    #[test]
    fn test_tone_rejects_tiny_duration() {
        assert!(simple_tone(440.0, 0.005, Waveform::Sine, 0.5, RATE).is_err());
    }

    #[test]
    fn test_tone_rejects_non_finite_frequency() {
        assert!(matches!(
            simple_tone(f64::NAN, 0.2, Waveform::Sine, 0.5, RATE),
            Err(SoundError::InvalidFrequency(_))
        ));
        assert!(simple_tone(f64::NEG_INFINITY, 0.2, Waveform::Square, 0.5, RATE).is_err());
    }

    #[test]
    fn test_layered_rejects_non_finite_sweep() {
        let bad = Patch::Layered {
            layers: vec![Layer {
                waveform: Waveform::Sawtooth,
                sweep: FrequencySweep::new(f64::NAN, 100.0, 0.5),
            }],
            attack: 0.01,
            peak: 0.5,
            duration: 0.5,
        };
        assert!(patch(&bad, RATE, &mut StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn test_noise_length_and_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let buffer = noise(0.25, 0.3, RATE, &mut rng).unwrap();
        assert_eq!(buffer.samples().len(), 2_000);
        assert!(peak(&buffer) <= 0.3 + 1e-6);
    }

    #[test]
    fn test_noise_is_seed_deterministic() {
        let a = noise(0.1, 0.3, RATE, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = noise(0.1, 0.3, RATE, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a.samples(), b.samples());
    }

    #[test]
    fn test_pink_loop_period() {
        let mut rng = StdRng::seed_from_u64(3);
        let buffer = pink(2.0, presets::AMBIENT_GAIN, RATE, &mut rng);
        assert_eq!(buffer.samples().len(), 16_000);
        assert!(peak(&buffer) <= presets::AMBIENT_GAIN);
    }

    #[test]
    fn test_cursed_is_clipped() {
        let mut rng = StdRng::seed_from_u64(0);
        let buffer = patch(&presets::cursed(), RATE, &mut rng).unwrap();
        assert_eq!(buffer.samples().len(), 4_000);
        assert!(peak(&buffer) <= 1.0);
        assert!(peak(&buffer) > 0.5);
    }

    #[test]
    fn test_arpeggio_mixdown_length() {
        let mut rng = StdRng::seed_from_u64(0);
        let buffer = patch(
            &presets::game_start(Duration::from_millis(150)),
            RATE,
            &mut rng,
        )
        .unwrap();
        // Two 150ms gaps plus the last 150ms note
        assert_eq!(buffer.samples().len(), 3_600);
    }
}

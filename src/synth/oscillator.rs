//! Naive oscillators with exponential frequency sweeps.

use std::f64::consts::PI;

use crate::error::SoundError;

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
}

/// Phase-accumulating oscillator. Frequency is supplied per sample so the
/// caller can drive sweeps without discontinuities.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: u32) -> Self {
        Oscillator {
            waveform,
            phase: 0.0,
            sample_rate: sample_rate.max(1) as f64,
        }
    }

    /// Generate the next sample at `frequency` Hz.
    pub fn next_sample(&mut self, frequency: f64) -> f32 {
        let sample = match self.waveform {
            Waveform::Sine => (2.0 * PI * self.phase).sin(),
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * self.phase - 1.0,
        };

        self.phase += frequency / self.sample_rate;
        self.phase -= self.phase.floor();

        sample as f32
    }
}

/// Exponential glide from `start` to `end` Hz over `duration` seconds,
/// holding `end` afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencySweep {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

impl FrequencySweep {
    pub fn new(start: f64, end: f64, duration: f64) -> Self {
        Self {
            start,
            end,
            duration,
        }
    }

    pub fn constant(frequency: f64) -> Self {
        Self::new(frequency, frequency, 0.0)
    }

    /// Fails on a NaN or infinite endpoint, which would poison every sample
    pub fn validate(&self) -> Result<(), SoundError> {
        match [self.start, self.end].into_iter().find(|f| !f.is_finite()) {
            Some(bad) => Err(SoundError::InvalidFrequency(bad)),
            None => Ok(()),
        }
    }

    pub fn at(&self, t: f64) -> f64 {
        if self.duration <= 0.0 || t >= self.duration || self.start <= 0.0 || self.end <= 0.0 {
            return self.end;
        }
        if t <= 0.0 {
            return self.start;
        }
        self.start * (self.end / self.start).powf(t / self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_alternates() {
        // 2 samples per cycle
        let mut osc = Oscillator::new(Waveform::Square, 2);
        assert_eq!(osc.next_sample(1.0), 1.0);
        assert_eq!(osc.next_sample(1.0), -1.0);
        assert_eq!(osc.next_sample(1.0), 1.0);
    }

    #[test]
    fn test_sawtooth_ramps() {
        let mut osc = Oscillator::new(Waveform::Sawtooth, 4);
        let samples: Vec<f32> = (0..5).map(|_| osc.next_sample(1.0)).collect();
        assert_eq!(samples, vec![-1.0, -0.5, 0.0, 0.5, -1.0]);
    }

    #[test]
    fn test_sine_stays_in_range() {
        let mut osc = Oscillator::new(Waveform::Sine, 44_100);
        for _ in 0..10_000 {
            let s = osc.next_sample(440.0);
            assert!((-1.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn test_sweep_endpoints() {
        let sweep = FrequencySweep::new(400.0, 800.0, 0.3);
        assert_eq!(sweep.at(0.0), 400.0);
        assert!((sweep.at(0.15) - 400.0 * 2f64.sqrt()).abs() < 1e-9);
        assert_eq!(sweep.at(0.3), 800.0);
        assert_eq!(sweep.at(1.0), 800.0);
    }

    #[test]
    fn test_downward_sweep_is_monotonic() {
        let sweep = FrequencySweep::new(200.0, 50.0, 0.5);
        let mut previous = f64::MAX;
        for i in 0..=50 {
            let f = sweep.at(i as f64 * 0.01);
            assert!(f <= previous);
            previous = f;
        }
    }

    #[test]
    fn test_non_finite_sweeps_are_rejected() {
        assert!(FrequencySweep::constant(440.0).validate().is_ok());
        assert!(matches!(
            FrequencySweep::new(200.0, f64::INFINITY, 0.5).validate(),
            Err(SoundError::InvalidFrequency(f)) if f.is_infinite()
        ));
        assert!(FrequencySweep::constant(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_constant_sweep() {
        assert_eq!(FrequencySweep::constant(1000.0).at(0.02), 1000.0);
    }
}

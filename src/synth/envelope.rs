//! Attack / exponential-decay amplitude envelope.

use crate::error::SoundError;

/// Level the decay ramps down to at the end of the sound
pub const DECAY_FLOOR: f32 = 0.001;

/// Attack used by the plain tone and noise primitives
pub const STANDARD_ATTACK: f32 = 0.01;

/// Linear ramp 0 → `peak` over `attack` seconds, then exponential decay to
/// [`DECAY_FLOOR`] at `duration`. Silent after `duration`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack: f32,
    pub peak: f32,
    pub duration: f32,
}

impl Envelope {
    /// Fails when the attack would not fit inside the sound
    pub fn new(attack: f32, peak: f32, duration: f32) -> Result<Self, SoundError> {
        if !(duration > attack) || attack < 0.0 {
            return Err(SoundError::InvalidDuration { duration, attack });
        }
        Ok(Self {
            attack,
            peak: peak.max(0.0),
            duration,
        })
    }

    pub fn standard(peak: f32, duration: f32) -> Result<Self, SoundError> {
        Self::new(STANDARD_ATTACK, peak, duration)
    }

    pub fn gain_at(&self, t: f32) -> f32 {
        if t < 0.0 || t >= self.duration {
            return 0.0;
        }
        if t < self.attack {
            return self.peak * t / self.attack;
        }
        if self.peak <= DECAY_FLOOR {
            return self.peak;
        }
        let progress = (t - self.attack) / (self.duration - self.attack);
        self.peak * (DECAY_FLOOR / self.peak).powf(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_is_linear() {
        let env = Envelope::standard(0.5, 0.1).unwrap();
        assert_eq!(env.gain_at(0.0), 0.0);
        assert!((env.gain_at(0.005) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_peak_then_decay() {
        let env = Envelope::standard(0.4, 0.2).unwrap();
        assert!((env.gain_at(0.01) - 0.4).abs() < 1e-6);
        assert!(env.gain_at(0.1) < 0.4);
        assert!(env.gain_at(0.1999) < 0.0011);
        assert_eq!(env.gain_at(0.2), 0.0);
    }

    #[test]
    fn test_decay_is_monotonic() {
        let env = Envelope::new(0.05, 0.6, 0.5).unwrap();
        let mut previous = f32::MAX;
        for i in 5..50 {
            let g = env.gain_at(i as f32 * 0.01);
            assert!(g <= previous);
            previous = g;
        }
    }

    #[test]
    fn test_rejects_short_duration() {
        assert!(matches!(
            Envelope::standard(0.3, 0.01),
            Err(SoundError::InvalidDuration { .. })
        ));
        assert!(Envelope::standard(0.3, 0.005).is_err());
        assert!(Envelope::standard(0.3, f32::NAN).is_err());
    }

    #[test]
    fn test_silent_peak() {
        let env = Envelope::standard(0.0, 0.1).unwrap();
        assert_eq!(env.gain_at(0.05), 0.0);
    }
}

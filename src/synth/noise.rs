//! White and pink noise.

use rand::Rng;

/// Output scale applied to the raw pink sum
pub const PINK_SCALE: f32 = 0.11;

/// Uniform white noise in [-1, 1]
pub fn white<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen_range(-1.0f32..=1.0)
}

/// Paul Kellet's refined pink-noise filter.
///
/// Six leaky integrators plus a one-sample delayed white term; the result
/// is scaled by [`PINK_SCALE`] and clamped to [-1, 1].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinkFilter {
    b: [f32; 7],
}

impl PinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, white: f32) -> f32 {
        let b = &mut self.b;
        b[0] = 0.99886 * b[0] + white * 0.0555179;
        b[1] = 0.99332 * b[1] + white * 0.0750759;
        b[2] = 0.96900 * b[2] + white * 0.1538520;
        b[3] = 0.86650 * b[3] + white * 0.3104856;
        b[4] = 0.55000 * b[4] + white * 0.5329522;
        b[5] = -0.7616 * b[5] - white * 0.0168980;
        let pink = b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362;
        b[6] = white * 0.115926;

        (pink * PINK_SCALE).clamp(-1.0, 1.0)
    }
}

/// Filter a white-noise sequence into `gain`-scaled pink noise
pub fn pink<I>(white_samples: I, gain: f32) -> Vec<f32>
where
    I: IntoIterator<Item = f32>,
{
    let mut filter = PinkFilter::new();
    white_samples
        .into_iter()
        .map(|w| filter.process(w) * gain)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_white_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            assert!((-1.0..=1.0).contains(&white(&mut rng)));
        }
    }

    #[test]
    fn test_first_sample() {
        let mut filter = PinkFilter::new();
        let expected = (0.0555179 + 0.0750759 + 0.1538520 + 0.3104856 + 0.5329522 - 0.0168980
            + 0.5362)
            * PINK_SCALE;
        assert!((filter.process(1.0) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_delayed_white_term() {
        let mut filter = PinkFilter::new();
        filter.process(1.0);
        let second = filter.process(0.0);
        let expected = (0.99886 * 0.0555179
            + 0.99332 * 0.0750759
            + 0.96900 * 0.1538520
            + 0.86650 * 0.3104856
            + 0.55000 * 0.5329522
            + 0.7616 * 0.0168980
            + 0.115926)
            * PINK_SCALE;
        assert!((second - expected).abs() < 1e-5);
    }

    #[test]
    fn test_silence_in_silence_out() {
        assert!(pink(vec![0.0; 64], 1.0).iter().all(|s| *s == 0.0));
    }

    proptest! {
        #[test]
        fn pink_is_bounded(whites in prop::collection::vec(-1.0f32..=1.0, 0..4096), gain in 0.0f32..1.0) {
            for sample in pink(whites, gain) {
                prop_assert!(sample.abs() <= gain);
            }
        }

        #[test]
        fn pink_is_deterministic(seed in any::<u64>()) {
            let whites: Vec<f32> = {
                let mut rng = StdRng::seed_from_u64(seed);
                (0..512).map(|_| white(&mut rng)).collect()
            };
            prop_assert_eq!(pink(whites.clone(), 0.1), pink(whites, 0.1));
        }
    }
}

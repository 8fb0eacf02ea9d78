//! Playback parameters
//!
//! Per-sound defaults, per-call overrides and the master-volume scaling
//! applied before anything reaches an output stage.

/// Parameters applied to a single playback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackParams {
    /// Volume multiplier (0.0-1.0)
    pub volume: f32,

    /// Playback-rate multiplier (> 0)
    pub pitch: f32,

    /// Stereo position (-1.0 left to 1.0 right)
    pub pan: f32,

    pub looped: bool,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pitch: 1.0,
            pan: 0.0,
            looped: false,
        }
    }
}

impl PlaybackParams {
    /// Apply overrides field by field; unspecified fields keep their value
    pub fn merge(mut self, overrides: &ParamOverrides) -> Self {
        if let Some(volume) = overrides.volume {
            self.volume = volume;
        }
        if let Some(pitch) = overrides.pitch {
            self.pitch = pitch;
        }
        if let Some(pan) = overrides.pan {
            self.pan = pan;
        }
        if let Some(looped) = overrides.looped {
            self.looped = looped;
        }
        self.sanitized()
    }

    /// Clamp every field into its legal range
    pub fn sanitized(self) -> Self {
        Self {
            volume: clamp_unit(self.volume),
            pitch: if self.pitch.is_finite() && self.pitch > 0.0 {
                self.pitch
            } else {
                1.0
            },
            pan: if self.pan.is_nan() {
                0.0
            } else {
                self.pan.clamp(-1.0, 1.0)
            },
            looped: self.looped,
        }
    }
}

/// Per-call overrides
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamOverrides {
    pub volume: Option<f32>,
    pub pitch: Option<f32>,
    pub pan: Option<f32>,
    pub looped: Option<bool>,
}

impl ParamOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn with_pan(mut self, pan: f32) -> Self {
        self.pan = Some(pan);
        self
    }

    pub fn with_loop(mut self, looped: bool) -> Self {
        self.looped = Some(looped);
        self
    }
}

/// Volume handed to an output stage: `requested * master`, clamped to [0, 1]
pub fn effective_volume(requested: f32, master: f32) -> f32 {
    clamp_unit(requested * master)
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

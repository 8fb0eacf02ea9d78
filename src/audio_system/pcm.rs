//! In-memory PCM buffers
//!
//! Decoded assets and synthesized effects both end up as interleaved `f32`
//! samples shared behind an `Arc`, so replaying a sound never copies it.
use std::sync::Arc;
use std::time::Duration;

use rodio::Source;

/// Interleaved f32 samples with their format
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    channels: u16,
    sample_rate: u32,
    samples: Arc<[f32]>,
}

impl PcmBuffer {
    pub fn new(channels: u16, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
            samples: samples.into(),
        }
    }

    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::new(1, sample_rate, samples)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Play the buffer once
    pub fn source(&self) -> PcmSource {
        PcmSource {
            buffer: self.clone(),
            position: 0,
            looped: false,
        }
    }

    /// Play the buffer forever, wrapping back to the first sample
    pub fn looped_source(&self) -> PcmSource {
        PcmSource {
            buffer: self.clone(),
            position: 0,
            looped: true,
        }
    }

    /// Mix `other` (same format) into this buffer starting at `offset_frames`,
    /// growing the buffer when needed
    pub fn mix_at(&self, other: &PcmBuffer, offset_frames: usize) -> PcmBuffer {
        let channels = self.channels as usize;
        let offset = offset_frames * channels;
        let len = self.samples.len().max(offset + other.samples.len());

        let mut mixed = vec![0.0f32; len];
        mixed[..self.samples.len()].copy_from_slice(&self.samples);
        for (i, sample) in other.samples.iter().enumerate() {
            mixed[offset + i] = (mixed[offset + i] + sample).clamp(-1.0, 1.0);
        }

        PcmBuffer::new(self.channels, self.sample_rate, mixed)
    }
}

/// rodio source reading from a shared [`PcmBuffer`]
#[derive(Debug, Clone)]
pub struct PcmSource {
    buffer: PcmBuffer,
    position: usize,
    looped: bool,
}

impl Iterator for PcmSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let samples = &self.buffer.samples;
        if samples.is_empty() {
            return None;
        }
        if self.position >= samples.len() {
            if !self.looped {
                return None;
            }
            self.position = 0;
        }
        let sample = samples[self.position];
        self.position += 1;
        Some(sample)
    }
}

impl Source for PcmSource {
    fn current_frame_len(&self) -> Option<usize> {
        if self.looped {
            None
        } else {
            Some(self.buffer.samples.len().saturating_sub(self.position))
        }
    }

    fn channels(&self) -> u16 {
        self.buffer.channels
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        if self.looped {
            None
        } else {
            Some(self.buffer.duration())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_plays_once() {
        let buffer = PcmBuffer::mono(8_000, vec![0.1, 0.2, 0.3]);
        let played: Vec<f32> = buffer.source().collect();
        assert_eq!(played, vec![0.1, 0.2, 0.3]);
        assert_eq!(buffer.source().total_duration(), Some(buffer.duration()));
    }

    #[test]
    fn test_looped_source_wraps() {
        let buffer = PcmBuffer::mono(8_000, vec![0.1, 0.2]);
        let played: Vec<f32> = buffer.looped_source().take(5).collect();
        assert_eq!(played, vec![0.1, 0.2, 0.1, 0.2, 0.1]);
        assert_eq!(buffer.looped_source().total_duration(), None);
    }

    #[test]
    fn test_empty_looped_source_terminates() {
        let buffer = PcmBuffer::mono(8_000, Vec::new());
        assert_eq!(buffer.looped_source().next(), None);
    }

    #[test]
    fn test_duration_accounts_for_channels() {
        let buffer = PcmBuffer::new(2, 4, vec![0.0; 8]);
        assert_eq!(buffer.frames(), 4);
        assert_eq!(buffer.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_mix_at_offset() {
        let base = PcmBuffer::mono(10, vec![0.5, 0.5]);
        let other = PcmBuffer::mono(10, vec![0.25, 0.25]);
        let mixed = base.mix_at(&other, 1);
        assert_eq!(mixed.samples(), &[0.5, 0.75, 0.25]);
    }
}

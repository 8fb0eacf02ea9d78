//! Device-free output
//!
//! Accepts voices without producing sound. Used for CI, servers without a
//! sound card and the façade tests; voices stay "playing" until stopped or
//! until [`HeadlessOutput::complete_all`] simulates their natural end.
//!
//! A recording output keeps every voice it started so tests can inspect
//! them. A [`HeadlessOutput::silent`] one keeps only unfinished voices.
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::output::{
    AudioOutput, BoxedSource, ContextState, Voice, VoiceSettings, DEFAULT_SAMPLE_RATE,
};
use crate::error::SoundError;

pub struct HeadlessOutput {
    available: bool,
    sample_rate: u32,
    state: Mutex<ContextState>,
    recording: bool,
    voices: Mutex<Vec<Arc<HeadlessVoice>>>,
    started: AtomicUsize,
    resumes: AtomicUsize,
}

impl HeadlessOutput {
    pub fn new() -> Self {
        Self::with_sample_rate(DEFAULT_SAMPLE_RATE)
    }

    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            available: true,
            sample_rate,
            state: Mutex::new(ContextState::Suspended),
            recording: true,
            voices: Mutex::new(Vec::new()),
            started: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
        }
    }

    /// An output that forgets voices once they finish
    pub fn silent() -> Self {
        Self {
            recording: false,
            ..Self::new()
        }
    }

    /// An output that reports no device, as on a machine without audio
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Voices kept so far, oldest first: every voice started when
    /// recording, otherwise the unfinished ones
    pub fn voices(&self) -> Vec<Arc<HeadlessVoice>> {
        self.voices.lock().clone()
    }

    pub fn started_count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Voices neither stopped nor completed
    pub fn playing_count(&self) -> usize {
        self.voices.lock().iter().filter(|v| !v.is_finished()).count()
    }

    /// Number of suspended → running transitions
    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    /// Mark every voice as having reached its natural end
    pub fn complete_all(&self) {
        for voice in self.voices.lock().iter() {
            voice.completed.store(true, Ordering::SeqCst);
        }
    }
}

impl Default for HeadlessOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for HeadlessOutput {
    fn is_available(&self) -> bool {
        self.available
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn state(&self) -> ContextState {
        *self.state.lock()
    }

    fn resume(&self) -> Result<(), SoundError> {
        if !self.available {
            return Err(SoundError::CapabilityUnavailable);
        }
        let mut state = self.state.lock();
        match *state {
            ContextState::Running => Ok(()),
            ContextState::Closed => Err(SoundError::CapabilityUnavailable),
            ContextState::Suspended => {
                *state = ContextState::Running;
                self.resumes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    fn suspend(&self) {
        let mut state = self.state.lock();
        if *state == ContextState::Running {
            *state = ContextState::Suspended;
        }
    }

    fn dispose(&self) {
        *self.state.lock() = ContextState::Closed;
        for voice in self.voices.lock().iter() {
            voice.stop();
        }
    }

    fn start(
        &self,
        source: BoxedSource,
        settings: VoiceSettings,
    ) -> Result<Arc<dyn Voice>, SoundError> {
        if self.state() != ContextState::Running {
            return Err(SoundError::PlaybackTransientFailure(
                "audio output is not running".into(),
            ));
        }

        let mut voices = self.voices.lock();
        if !self.recording {
            voices.retain(|v| !v.is_finished());
        }
        let voice = Arc::new(HeadlessVoice {
            id: self.started.fetch_add(1, Ordering::SeqCst),
            channels: source.channels(),
            sample_rate: source.sample_rate(),
            duration: source.total_duration(),
            settings: Mutex::new(settings),
            stopped: AtomicBool::new(false),
            completed: AtomicBool::new(false),
        });
        voices.push(Arc::clone(&voice));

        let voice: Arc<dyn Voice> = voice;
        Ok(voice)
    }
}

/// A voice recorded by [`HeadlessOutput`]
#[derive(Debug)]
pub struct HeadlessVoice {
    id: usize,
    channels: u16,
    sample_rate: u32,
    duration: Option<Duration>,
    settings: Mutex<VoiceSettings>,
    stopped: AtomicBool,
    completed: AtomicBool,
}

impl HeadlessVoice {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// `None` for looping sources
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Current settings, including changes made after start
    pub fn settings(&self) -> VoiceSettings {
        *self.settings.lock()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Voice for HeadlessVoice {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn set_volume(&self, volume: f32) {
        self.settings.lock().volume = volume.clamp(0.0, 1.0);
    }

    fn set_speed(&self, speed: f32) {
        self.settings.lock().speed = speed;
    }

    fn is_finished(&self) -> bool {
        self.is_stopped() || self.completed.load(Ordering::SeqCst)
    }
}

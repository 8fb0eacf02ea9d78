/// Playback handles
///
/// A handle owns one live voice and gives the same stop/volume/pitch
/// surface whichever backend produced it. Once stopped, or once the voice
/// ends by itself, every method is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::output::Voice;
use super::params::effective_volume;
use super::resolver::Backend;
use super::source::SoundName;
use crate::settings::MasterState;

/// Control over one playing sound
#[derive(Clone)]
pub struct PlaybackHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    name: SoundName,
    backend: Backend,
    voice: Arc<dyn Voice>,
    requested_volume: Mutex<f32>,
    master: Arc<RwLock<MasterState>>,
    invalid: AtomicBool,
}

impl PlaybackHandle {
    pub(crate) fn new(
        name: SoundName,
        backend: Backend,
        voice: Arc<dyn Voice>,
        requested_volume: f32,
        master: Arc<RwLock<MasterState>>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                name,
                backend,
                voice,
                requested_volume: Mutex::new(requested_volume),
                master,
                invalid: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> SoundName {
        self.inner.name
    }

    pub fn backend(&self) -> Backend {
        self.inner.backend
    }

    /// Volume requested for this sound, before master scaling
    pub fn volume(&self) -> f32 {
        *self.inner.requested_volume.lock()
    }

    /// Whether the sound is still playing
    pub fn is_active(&self) -> bool {
        if self.inner.invalid.load(Ordering::SeqCst) {
            return false;
        }
        if self.inner.voice.is_finished() {
            self.inner.invalid.store(true, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Stop playback and release the voice. Idempotent.
    pub fn stop(&self) {
        if !self.is_active() || self.inner.invalid.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.voice.stop();
        tracing::debug!("Stopped {} ({})", self.inner.name, self.inner.backend);
    }

    /// Change the requested volume; the master volume still applies
    pub fn set_volume(&self, volume: f32) {
        if !self.is_active() {
            return;
        }
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        *self.inner.requested_volume.lock() = volume;
        self.apply_master();
    }

    /// Change the playback rate. Synthesized sounds keep their generated
    /// pitch.
    pub fn set_pitch(&self, pitch: f32) {
        if !self.is_active() {
            return;
        }
        if self.inner.backend == Backend::Synthesized {
            tracing::debug!("Pitch change ignored for synthesized {}", self.inner.name);
            return;
        }
        if pitch.is_finite() && pitch > 0.0 {
            self.inner.voice.set_speed(pitch);
        }
    }

    /// Push the current master volume to the voice
    pub(crate) fn apply_master(&self) {
        if !self.is_active() {
            return;
        }
        let master = self.inner.master.read().master_volume;
        let requested = *self.inner.requested_volume.lock();
        self.inner.voice.set_volume(effective_volume(requested, master));
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("name", &self.inner.name)
            .field("backend", &self.inner.backend)
            .field("active", &self.is_active())
            .finish()
    }
}

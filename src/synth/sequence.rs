//! Scheduled multi-voice sequences
//!
//! The first step starts immediately; the rest are started by a timer thread
//! unless the sequence is stopped first.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::audio_system::output::{AudioOutput, Voice, VoiceSettings};
use crate::audio_system::pcm::PcmBuffer;
use crate::error::SoundError;

struct State {
    started: Vec<Arc<dyn Voice>>,
    settings: VoiceSettings,
    stopped: bool,
}

/// A cancellable run of buffers started `spacing` apart
pub struct Sequence {
    state: Arc<Mutex<State>>,
    cancel: Sender<()>,
    scheduled_done: Arc<AtomicBool>,
}

impl Sequence {
    pub fn start(
        output: Arc<dyn AudioOutput>,
        steps: Vec<PcmBuffer>,
        spacing: Duration,
        settings: VoiceSettings,
    ) -> Result<Arc<Self>, SoundError> {
        let mut steps = steps.into_iter();
        let mut started = Vec::new();
        if let Some(first) = steps.next() {
            started.push(output.start(Box::new(first.source()), settings)?);
        }

        let state = Arc::new(Mutex::new(State {
            started,
            settings,
            stopped: false,
        }));
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let scheduled_done = Arc::new(AtomicBool::new(false));

        let remaining: Vec<PcmBuffer> = steps.collect();
        if remaining.is_empty() {
            scheduled_done.store(true, Ordering::SeqCst);
        } else {
            let state = Arc::clone(&state);
            let done = Arc::clone(&scheduled_done);
            std::thread::Builder::new()
                .name("sfx-sequence".to_string())
                .spawn(move || {
                    for step in remaining {
                        match cancel_rx.recv_timeout(spacing) {
                            Ok(()) => break,
                            Err(RecvTimeoutError::Timeout) => {}
                            // Handle dropped: keep playing, fire-and-forget
                            Err(RecvTimeoutError::Disconnected) => std::thread::sleep(spacing),
                        }
                        let mut state = state.lock();
                        if state.stopped {
                            break;
                        }
                        match output.start(Box::new(step.source()), state.settings) {
                            Ok(voice) => state.started.push(voice),
                            Err(e) => tracing::warn!("Sequence step dropped: {}", e),
                        }
                    }
                    done.store(true, Ordering::SeqCst);
                })
                .map_err(|e| SoundError::PlaybackTransientFailure(Box::new(e)))?;
        }

        Ok(Arc::new(Self {
            state,
            cancel: cancel_tx,
            scheduled_done,
        }))
    }

    #[cfg(test)]
    fn started_steps(&self) -> usize {
        self.state.lock().started.len()
    }
}

impl Voice for Sequence {
    fn stop(&self) {
        let mut state = self.state.lock();
        if state.stopped {
            return;
        }
        state.stopped = true;
        let _ = self.cancel.try_send(());
        for voice in &state.started {
            voice.stop();
        }
    }

    fn set_volume(&self, volume: f32) {
        let mut state = self.state.lock();
        state.settings.volume = volume;
        for voice in &state.started {
            voice.set_volume(volume);
        }
    }

    fn set_speed(&self, _speed: f32) {}

    fn is_finished(&self) -> bool {
        let state = self.state.lock();
        state.stopped
            || (self.scheduled_done.load(Ordering::SeqCst)
                && state.started.iter().all(|v| v.is_finished()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::headless::HeadlessOutput;
    use std::time::Instant;

    fn steps(n: usize) -> Vec<PcmBuffer> {
        (0..n).map(|_| PcmBuffer::mono(8_000, vec![0.0; 80])).collect()
    }

    fn running() -> Arc<HeadlessOutput> {
        let output = Arc::new(HeadlessOutput::new());
        output.resume().unwrap();
        output
    }

    #[test]
    fn test_all_steps_start() {
        let output = running();
        let seq = Sequence::start(
            output.clone(),
            steps(3),
            Duration::from_millis(5),
            VoiceSettings::default(),
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while seq.started_steps() < 3 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(output.started_count(), 3);

        assert!(!seq.is_finished());
        output.complete_all();
        assert!(seq.is_finished());
    }

    #[test]
    fn test_stop_cancels_pending_steps() {
        let output = running();
        let seq = Sequence::start(
            output.clone(),
            steps(3),
            Duration::from_secs(30),
            VoiceSettings::default(),
        )
        .unwrap();

        assert_eq!(output.started_count(), 1);
        seq.stop();
        seq.stop();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(output.started_count(), 1);
        assert!(output.voices()[0].is_stopped());
        assert!(seq.is_finished());
    }

    #[test]
    fn test_volume_reaches_later_steps() {
        let output = running();
        let seq = Sequence::start(
            output.clone(),
            steps(2),
            Duration::from_millis(50),
            VoiceSettings::default(),
        )
        .unwrap();
        seq.set_volume(0.25);

        let deadline = Instant::now() + Duration::from_secs(2);
        while seq.started_steps() < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        for voice in output.voices() {
            assert_eq!(voice.settings().volume, 0.25);
        }
    }

    #[test]
    fn test_first_step_error_propagates() {
        let output = Arc::new(HeadlessOutput::new());
        let result = Sequence::start(
            output,
            steps(2),
            Duration::from_millis(5),
            VoiceSettings::default(),
        );
        assert!(result.is_err());
    }
}

//! Audio output context
//!
//! A single process-wide output shared by the synthesizer and the façade.
//! It starts suspended and is resumed by the first playback request, so
//! nothing touches the device until a sound is actually wanted.
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::source::ChannelVolume;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

use crate::error::SoundError;

/// Boxed sample stream handed to an output
pub type BoxedSource = Box<dyn Source<Item = f32> + Send>;

/// Sample rate assumed when the device does not report one
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Lifecycle state of an output context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// Settings applied to a voice when it starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSettings {
    /// Output gain, already scaled by the master volume
    pub volume: f32,

    /// Playback-rate multiplier
    pub speed: f32,

    /// Stereo balance (-1.0 to 1.0)
    pub pan: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            speed: 1.0,
            pan: 0.0,
        }
    }
}

/// A live sound on an output
pub trait Voice: Send + Sync {
    fn stop(&self);
    fn set_volume(&self, volume: f32);
    fn set_speed(&self, speed: f32);
    fn is_finished(&self) -> bool;
}

/// The audio-output context
pub trait AudioOutput: Send + Sync {
    /// Whether an output device was present when the context was created
    fn is_available(&self) -> bool;

    fn sample_rate(&self) -> u32;

    fn state(&self) -> ContextState;

    fn resume(&self) -> Result<(), SoundError>;

    fn suspend(&self);

    /// Stop everything and release the device; the context cannot be resumed
    fn dispose(&self);

    /// Start a voice. Fails unless the context is running.
    fn start(&self, source: BoxedSource, settings: VoiceSettings)
        -> Result<Arc<dyn Voice>, SoundError>;
}

/// Per-channel gains for a stereo balance
pub fn balance_gains(pan: f32) -> [f32; 2] {
    let pan = pan.clamp(-1.0, 1.0);
    [(1.0 - pan).min(1.0), (1.0 + pan).min(1.0)]
}

/// Keeps the `OutputStream` alive on its own thread; the stream itself
/// cannot leave the thread that opened it.
struct StreamKeeper {
    handle: OutputStreamHandle,
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl StreamKeeper {
    fn open() -> Result<Self, SoundError> {
        let (ready_tx, ready_rx) = bounded(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let thread = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = ready_tx.send(Ok(handle));
                    // Blocks until dispose sends or drops the sender
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| SoundError::PlaybackTransientFailure(Box::new(e)))?;

        let handle = ready_rx
            .recv()
            .map_err(|e| SoundError::PlaybackTransientFailure(Box::new(e)))?
            .map_err(|e| SoundError::PlaybackTransientFailure(Box::new(e)))?;

        Ok(Self {
            handle,
            shutdown: shutdown_tx,
            thread: Some(thread),
        })
    }

    fn close(mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Output context backed by the default rodio device
pub struct RodioOutput {
    sample_rate: u32,
    state: Mutex<ContextState>,
    stream: Mutex<Option<StreamKeeper>>,
    voices: Mutex<Vec<Weak<SinkVoice>>>,
}

impl RodioOutput {
    /// Probe the default output device. The stream is not opened until
    /// [`AudioOutput::resume`].
    pub fn new() -> Result<Self, SoundError> {
        let host = rodio::cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(SoundError::CapabilityUnavailable)?;

        let sample_rate = device
            .default_output_config()
            .map(|config| config.sample_rate().0)
            .unwrap_or(DEFAULT_SAMPLE_RATE);

        tracing::info!(
            "Audio device found: {} ({} Hz)",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate
        );

        Ok(Self {
            sample_rate,
            state: Mutex::new(ContextState::Suspended),
            stream: Mutex::new(None),
            voices: Mutex::new(Vec::new()),
        })
    }

    fn live_voices(&self) -> Vec<Arc<SinkVoice>> {
        let mut voices = self.voices.lock();
        voices.retain(|v| v.strong_count() > 0);
        voices.iter().filter_map(Weak::upgrade).collect()
    }
}

impl AudioOutput for RodioOutput {
    fn is_available(&self) -> bool {
        true
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn state(&self) -> ContextState {
        *self.state.lock()
    }

    fn resume(&self) -> Result<(), SoundError> {
        let mut state = self.state.lock();
        match *state {
            ContextState::Running => return Ok(()),
            ContextState::Closed => return Err(SoundError::CapabilityUnavailable),
            ContextState::Suspended => {}
        }

        let mut stream = self.stream.lock();
        if stream.is_none() {
            *stream = Some(StreamKeeper::open()?);
            tracing::info!("✓ Audio output stream opened");
        }
        drop(stream);

        for voice in self.live_voices() {
            voice.sink.play();
        }
        *state = ContextState::Running;
        Ok(())
    }

    fn suspend(&self) {
        let mut state = self.state.lock();
        if *state != ContextState::Running {
            return;
        }
        for voice in self.live_voices() {
            voice.sink.pause();
        }
        *state = ContextState::Suspended;
        tracing::debug!("Audio output suspended");
    }

    fn dispose(&self) {
        let mut state = self.state.lock();
        for voice in self.live_voices() {
            voice.sink.stop();
        }
        self.voices.lock().clear();
        if let Some(keeper) = self.stream.lock().take() {
            keeper.close();
        }
        *state = ContextState::Closed;
        tracing::info!("Audio output closed");
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

        let stream = self.stream.lock();
        let keeper = stream.as_ref().ok_or_else(|| {
            SoundError::PlaybackTransientFailure("audio output stream missing".into())
        })?;
        let sink = Sink::try_new(&keeper.handle)
            .map_err(|e| SoundError::PlaybackTransientFailure(Box::new(e)))?;
        drop(stream);

        sink.set_volume(settings.volume);
        sink.set_speed(settings.speed);
        if settings.pan != 0.0 {
            let [left, right] = balance_gains(settings.pan);
            sink.append(ChannelVolume::new(source, vec![left, right]));
        } else {
            sink.append(source);
        }
        sink.play();

        let voice = Arc::new(SinkVoice { sink });
        let mut voices = self.voices.lock();
        voices.retain(|v| v.strong_count() > 0);
        voices.push(Arc::downgrade(&voice));

        let voice: Arc<dyn Voice> = voice;
        Ok(voice)
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        if let Some(keeper) = self.stream.get_mut().take() {
            keeper.close();
        }
    }
}

/// One rodio sink per voice
struct SinkVoice {
    sink: Sink,
}

impl Voice for SinkVoice {
    fn stop(&self) {
        self.sink.stop();
    }

    fn set_volume(&self, volume: f32) {
        self.sink.set_volume(volume.clamp(0.0, 1.0));
    }

    fn set_speed(&self, speed: f32) {
        self.sink.set_speed(speed);
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }
}

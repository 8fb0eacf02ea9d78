/// Sound system façade
///
/// Resolves symbolic sound names to playable audio, picking the first
/// backend that works (Buffered → Streaming → Synthesized), and applies
/// volume, pitch and pan the same way whichever backend won.
use std::collections::HashMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Mutex, RwLock};

use super::decode;
use super::handle::PlaybackHandle;
use super::output::{AudioOutput, ContextState, Voice, VoiceSettings};
use super::params::{effective_volume, ParamOverrides, PlaybackParams};
use super::resolver::{Backend, ResolutionCache, ResolutionState, ResolvedSound};
use super::source::SoundName;
use crate::assets::{self, AssetSource};
use crate::config::SoundConfig;
use crate::error::SoundError;
use crate::messaging::{GameEvent, SoundBus, SoundEvent, SubscriberId};
use crate::settings::{JsonSettingsStore, MasterState, MemorySettingsStore, SettingsStore};
use crate::synth::Synthesizer;

/// Push deltas are clamped to this magnitude before shaping pitch
pub const PUSH_DELTA_LIMIT: f32 = 100.0;

/// Sound and pitch override for a resolved push
pub fn push_sound(delta: f32, cursed: bool) -> (SoundName, ParamOverrides) {
    if cursed {
        return (SoundName::Cursed, ParamOverrides::none());
    }

    let delta = if delta.is_finite() {
        delta.clamp(-PUSH_DELTA_LIMIT, PUSH_DELTA_LIMIT)
    } else {
        0.0
    };
    if delta > 0.0 {
        (
            SoundName::PushPositive,
            ParamOverrides::none().with_pitch(1.0 + delta / 500.0),
        )
    } else {
        (
            SoundName::PushNegative,
            ParamOverrides::none().with_pitch(0.8 + delta / 500.0),
        )
    }
}

/// Builder for [`SoundSystem`]
pub struct SoundSystemBuilder {
    config: SoundConfig,
    output: Option<Arc<dyn AudioOutput>>,
    assets: Option<Arc<dyn AssetSource>>,
    settings: Option<Arc<dyn SettingsStore>>,
}

impl SoundSystemBuilder {
    /// Output context shared with the synthesizer. Without one every play
    /// is silent.
    pub fn with_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.output = Some(output);
        self
    }

    /// Defaults to the configured asset base
    pub fn with_assets(mut self, assets: Arc<dyn AssetSource>) -> Self {
        self.assets = Some(assets);
        self
    }

    /// Defaults to the JSON settings file
    pub fn with_settings_store(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn build(self) -> SoundSystem {
        let config = self.config;

        let assets = self
            .assets
            .unwrap_or_else(|| assets::from_base(&config.asset_base));
        let settings = self
            .settings
            .unwrap_or_else(|| default_settings_store(&config));

        let master = match settings.load() {
            Ok(stored) => stored.into_state(),
            Err(e) => {
                tracing::warn!("Failed to load sound settings, using defaults: {}", e);
                MasterState::default()
            }
        };

        let synth = match (&self.output, config.synthesis_fallback) {
            (Some(output), true) => match Synthesizer::new(Arc::clone(output)) {
                Ok(synth) => Some(synth.with_note_spacing(config.note_spacing())),
                Err(e) => {
                    tracing::warn!("Synthesis backend unavailable: {}", e);
                    None
                }
            },
            _ => None,
        };

        tracing::info!(
            "Sound system created (enabled: {}, master volume: {:.2}, synthesis: {})",
            master.enabled,
            master.master_volume,
            synth.is_some()
        );

        SoundSystem {
            inner: Arc::new(Inner {
                config,
                output: self.output,
                synth,
                assets,
                settings,
                master: Arc::new(RwLock::new(master)),
                cache: ResolutionCache::new(),
                live: Mutex::new(Vec::new()),
                ambient: Mutex::new(None),
                deferred: Mutex::new(HashMap::new()),
                initialized: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
        }
    }
}

fn default_settings_store(config: &SoundConfig) -> Arc<dyn SettingsStore> {
    if let Some(path) = &config.settings_path {
        return Arc::new(JsonSettingsStore::new(path));
    }
    match JsonSettingsStore::at_default_location() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!("Sound settings will not persist: {}", e);
            Arc::new(MemorySettingsStore::new())
        }
    }
}

struct Inner {
    config: SoundConfig,
    output: Option<Arc<dyn AudioOutput>>,
    synth: Option<Synthesizer>,
    assets: Arc<dyn AssetSource>,
    settings: Arc<dyn SettingsStore>,
    master: Arc<RwLock<MasterState>>,
    cache: ResolutionCache,
    live: Mutex<Vec<PlaybackHandle>>,
    ambient: Mutex<Option<PlaybackHandle>>,
    /// Plays waiting on a background resolution, by name
    deferred: Mutex<HashMap<SoundName, Vec<ParamOverrides>>>,
    initialized: AtomicBool,
    disposed: AtomicBool,
}

/// Process-wide sound façade. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct SoundSystem {
    inner: Arc<Inner>,
}

impl SoundSystem {
    pub fn builder(config: SoundConfig) -> SoundSystemBuilder {
        SoundSystemBuilder {
            config,
            output: None,
            assets: None,
            settings: None,
        }
    }

    pub fn config(&self) -> &SoundConfig {
        &self.inner.config
    }

    /// Resolve the configured preload list. Idempotent; plays are ignored
    /// until this has run.
    pub fn init(&self) {
        if self.inner.disposed.load(Ordering::SeqCst)
            || self.inner.initialized.swap(true, Ordering::SeqCst)
        {
            return;
        }

        let preload = self.inner.config.preload.clone();
        let resolved = self.preload(&preload);
        tracing::info!(
            "✓ Sound system initialized ({}/{} preloaded)",
            resolved,
            preload.len()
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    /// Resolve `names` concurrently and wait for all of them. Returns how
    /// many resolved.
    pub fn preload(&self, names: &[SoundName]) -> usize {
        std::thread::scope(|s| {
            let workers: Vec<_> = names
                .iter()
                .map(|&name| (name, s.spawn(move || self.resolve(name))))
                .collect();

            workers
                .into_iter()
                .map(|(name, worker)| match worker.join() {
                    Ok(Ok(backend)) => {
                        tracing::debug!("Preloaded {} ({})", name, backend);
                        true
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("Failed to preload {}: {}", name, e);
                        false
                    }
                    Err(_) => {
                        tracing::error!("Resolver for {} panicked", name);
                        false
                    }
                })
                .filter(|resolved| *resolved)
                .count()
        })
    }

    /// Resolve `name`, blocking until done. Concurrent calls for the same
    /// name share one attempt.
    pub fn resolve(&self, name: SoundName) -> Result<Backend, SoundError> {
        self.inner
            .cache
            .resolve_with(name, || self.resolve_uncached(name))
            .map(|sound| sound.backend())
    }

    pub fn resolution_state(&self, name: SoundName) -> ResolutionState {
        self.inner.cache.state(name)
    }

    /// Drop the cached resolution of `name`; the next play resolves again
    pub fn invalidate(&self, name: SoundName) -> bool {
        let removed = self.inner.cache.invalidate(name);
        if removed {
            tracing::debug!("Invalidated {}", name);
        }
        removed
    }

    fn resolve_uncached(&self, name: SoundName) -> Result<ResolvedSound, SoundError> {
        let config = &self.inner.config;
        let definition = name.definition();
        let locator = definition.locator.as_str();
        let mut failures: Vec<String> = Vec::new();

        if config.buffered_decode || config.streaming_fallback {
            match self.inner.assets.fetch(locator) {
                Ok(bytes) => {
                    let bytes: Arc<[u8]> = bytes.into();

                    if config.buffered_decode {
                        match decode::decode_buffered(locator, bytes.to_vec()) {
                            Ok(pcm) => {
                                tracing::info!("✓ {} ready (buffered, {:?})", name, pcm.duration());
                                return Ok(ResolvedSound::Buffered(pcm));
                            }
                            Err(e) => failures.push(format!("buffered: {}", describe(&e))),
                        }
                    }

                    if config.streaming_fallback {
                        match decode::probe_stream(locator, &bytes) {
                            Ok(()) => {
                                tracing::info!("✓ {} ready (streaming, {} bytes)", name, bytes.len());
                                return Ok(ResolvedSound::Streaming(bytes));
                            }
                            Err(e) => failures.push(format!("streaming: {}", describe(&e))),
                        }
                    }
                }
                Err(e) => failures.push(format!("fetch: {}", describe(&e))),
            }
        }

        if self.inner.synth.is_some() {
            if failures.is_empty() {
                tracing::info!("✓ {} ready (synthesized)", name);
            } else {
                tracing::warn!(
                    "Using synthesized {} ({})",
                    name,
                    failures.join("; ")
                );
            }
            return Ok(ResolvedSound::Synthesized);
        }

        failures.push("synthesis: unavailable".to_string());
        tracing::error!("Cannot resolve {}: {}", name, failures.join("; "));
        Err(SoundError::Unresolvable(name.to_string()))
    }

    /// Play `name` with `overrides` merged over its defaults.
    ///
    /// Returns `None` when sound is disabled, the system is not
    /// initialised, or playback failed. An unresolved name is resolved in
    /// the background and played once when ready; that call also returns
    /// `None`.
    pub fn play(&self, name: SoundName, overrides: ParamOverrides) -> Option<PlaybackHandle> {
        if !self.is_ready() {
            tracing::debug!("Ignoring play of {}: sound system not ready", name);
            return None;
        }

        match self.inner.cache.get(name) {
            Some(resolved) => self.start(name, &resolved, &overrides),
            None => {
                self.resolve_in_background(name, overrides);
                None
            }
        }
    }

    /// Play by string name; unknown names are logged and ignored
    pub fn play_named(&self, name: &str, overrides: ParamOverrides) -> Option<PlaybackHandle> {
        match name.parse::<SoundName>() {
            Ok(name) => self.play(name, overrides),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }

    pub fn play_event(&self, event: GameEvent) -> Option<PlaybackHandle> {
        self.play(event.sound(), ParamOverrides::none())
    }

    /// Play a game event by name (`game_start`, `level_up`, ...)
    pub fn play_game_event(&self, event: &str) -> Option<PlaybackHandle> {
        match event.parse::<GameEvent>() {
            Ok(event) => self.play_event(event),
            Err(_) => {
                tracing::warn!("Unknown game sound event: {}", event);
                None
            }
        }
    }

    /// Feedback for a resolved push; see [`push_sound`]
    pub fn play_push_sound(&self, delta: f32, cursed: bool) -> Option<PlaybackHandle> {
        let (name, overrides) = push_sound(delta, cursed);
        self.play(name, overrides)
    }

    /// Start the looping background sound, replacing any already running
    pub fn start_ambient(&self) -> Option<PlaybackHandle> {
        if !self.is_ready() {
            return None;
        }
        self.stop_ambient();

        if let Err(e) = self.resolve(SoundName::Ambient) {
            tracing::warn!("Ambient sound unavailable: {}", e);
            return None;
        }
        let handle = self.play(SoundName::Ambient, ParamOverrides::none().with_loop(true))?;
        *self.inner.ambient.lock() = Some(handle.clone());
        Some(handle)
    }

    pub fn stop_ambient(&self) {
        if let Some(handle) = self.inner.ambient.lock().take() {
            handle.stop();
        }
    }

    /// Stop every live sound
    pub fn stop_all(&self) {
        let handles: Vec<_> = self.inner.live.lock().drain(..).collect();
        let count = handles.len();
        for handle in handles {
            handle.stop();
        }
        self.inner.ambient.lock().take();
        tracing::debug!("Stopped all sounds ({})", count);
    }

    /// Flip the enabled flag and persist it. Disabling stops every live
    /// sound. Returns the new state.
    pub fn toggle(&self) -> bool {
        let state = {
            let mut master = self.inner.master.write();
            master.enabled = !master.enabled;
            *master
        };
        self.persist(&state);

        if !state.enabled {
            self.stop_all();
        }
        tracing::info!("Sound {}", if state.enabled { "enabled" } else { "disabled" });
        state.enabled
    }

    /// Set and persist the master volume; live sounds follow immediately
    pub fn set_master_volume(&self, volume: f32) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        let state = {
            let mut master = self.inner.master.write();
            master.master_volume = volume;
            *master
        };
        self.persist(&state);

        for handle in self.live_handles() {
            handle.apply_master();
        }
        tracing::debug!("Master volume set to {:.2}", volume);
    }

    pub fn master_volume(&self) -> f32 {
        self.inner.master.read().master_volume
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.master.read().enabled
    }

    pub fn master_state(&self) -> MasterState {
        *self.inner.master.read()
    }

    /// Whether synthesized fallback can be used
    pub fn synthesis_available(&self) -> bool {
        self.inner.synth.is_some()
    }

    /// Live sounds, after pruning finished ones
    pub fn live_handles(&self) -> Vec<PlaybackHandle> {
        let mut live = self.inner.live.lock();
        live.retain(|handle| handle.is_active());
        live.clone()
    }

    pub fn active_count(&self) -> usize {
        self.live_handles().len()
    }

    /// Stop everything, forget resolutions and close the output context.
    /// The system ignores plays afterwards.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_all();
        self.inner.cache.clear();
        if let Some(output) = &self.inner.output {
            output.dispose();
        }
        tracing::info!("Sound system disposed");
    }

    /// Subscribe to `bus` and play feedback for its events on a listener
    /// thread
    pub fn attach(&self, bus: &SoundBus) -> io::Result<BusListener> {
        let subscription = bus.subscribe();
        let id = subscription.id();
        let system = self.clone();

        // A failed spawn drops the subscription, which unsubscribes
        let thread = std::thread::Builder::new()
            .name("sfx-bus".to_string())
            .spawn(move || {
                for event in subscription.iter() {
                    system.handle_event(&event);
                }
                tracing::debug!("Sound bus listener stopped");
            })?;

        tracing::info!("✓ Sound system attached to bus");
        Ok(BusListener {
            bus: bus.clone(),
            id,
            thread: Some(thread),
        })
    }

    /// Play the feedback for one bus event
    pub fn handle_event(&self, event: &SoundEvent) -> Option<PlaybackHandle> {
        match event {
            SoundEvent::Game(event) => self.play_event(*event),
            SoundEvent::Push { delta, cursed } => self.play_push_sound(*delta, *cursed),
            SoundEvent::Ui(action) => action
                .sound()
                .and_then(|name| self.play(name, ParamOverrides::none())),
        }
    }

    fn is_ready(&self) -> bool {
        self.is_initialized() && !self.inner.disposed.load(Ordering::SeqCst) && self.is_enabled()
    }

    fn persist(&self, state: &MasterState) {
        if let Err(e) = self.inner.settings.save(state) {
            tracing::warn!("Failed to save sound settings: {}", e);
        }
    }

    /// Queue a play behind the in-flight resolution of `name`, starting
    /// one resolver thread per name
    fn resolve_in_background(&self, name: SoundName, overrides: ParamOverrides) {
        {
            let mut deferred = self.inner.deferred.lock();
            if let Some(queued) = deferred.get_mut(&name) {
                queued.push(overrides);
                return;
            }
            deferred.insert(name, vec![overrides]);
        }

        let system = self.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("sfx-resolve-{}", name))
            .spawn(move || system.finish_deferred(name));

        if let Err(e) = spawned {
            self.inner.deferred.lock().remove(&name);
            tracing::error!("Failed to spawn resolver for {}: {}", name, e);
        }
    }

    fn finish_deferred(&self, name: SoundName) {
        // The queue must be released even if a decoder panics
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.resolve(name)));
        let queued = self.inner.deferred.lock().remove(&name).unwrap_or_default();

        match result {
            // Re-check: sound may have been disabled while resolving
            Ok(Ok(_)) if self.is_ready() => {
                if let Some(resolved) = self.inner.cache.get(name) {
                    for overrides in &queued {
                        self.start(name, &resolved, overrides);
                    }
                }
            }
            Ok(Ok(_)) => tracing::debug!("Dropping {} deferred play(s) of {}", queued.len(), name),
            Ok(Err(e)) => tracing::warn!("Could not play {}: {}", name, e),
            Err(_) => tracing::error!("Resolver for {} panicked", name),
        }
    }

    fn start(
        &self,
        name: SoundName,
        resolved: &ResolvedSound,
        overrides: &ParamOverrides,
    ) -> Option<PlaybackHandle> {
        let definition = name.definition();
        let params = definition.defaults.merge(overrides);

        let voice = match self.start_voice(name, &definition.locator, resolved, &params) {
            Ok(voice) => voice,
            Err(SoundError::CapabilityUnavailable) => {
                tracing::debug!("No audio output for {}", name);
                return None;
            }
            Err(e) => {
                tracing::warn!("Playback of {} failed: {}", name, describe(&e));
                return None;
            }
        };

        let handle = PlaybackHandle::new(
            name,
            resolved.backend(),
            voice,
            params.volume,
            Arc::clone(&self.inner.master),
        );
        {
            let mut live = self.inner.live.lock();
            live.retain(|h| h.is_active());
            live.push(handle.clone());
        }

        // Disabled between the readiness check and now
        if !self.is_enabled() {
            handle.stop();
            return None;
        }

        tracing::debug!(
            "Playing {} ({}, volume {:.2}, pitch {:.2}, pan {:.2})",
            name,
            resolved.backend(),
            params.volume,
            params.pitch,
            params.pan
        );
        Some(handle)
    }

    fn start_voice(
        &self,
        name: SoundName,
        locator: &str,
        resolved: &ResolvedSound,
        params: &PlaybackParams,
    ) -> Result<Arc<dyn Voice>, SoundError> {
        let settings = VoiceSettings {
            volume: effective_volume(params.volume, self.master_volume()),
            speed: params.pitch,
            pan: params.pan,
        };

        match resolved {
            ResolvedSound::Buffered(pcm) => {
                let output = self.running_output()?;
                let source = if params.looped {
                    pcm.looped_source()
                } else {
                    pcm.source()
                };
                output.start(Box::new(source), settings)
            }
            ResolvedSound::Streaming(bytes) => {
                let output = self.running_output()?;
                let source = decode::open_stream(locator, bytes, params.looped)?;
                output.start(source, settings)
            }
            ResolvedSound::Synthesized => {
                let synth = self
                    .inner
                    .synth
                    .as_ref()
                    .ok_or(SoundError::CapabilityUnavailable)?;
                synth.play_looping(name, settings, params.looped)
            }
        }
    }

    /// The output context, resumed on first use
    fn running_output(&self) -> Result<&Arc<dyn AudioOutput>, SoundError> {
        let output = self
            .inner
            .output
            .as_ref()
            .ok_or(SoundError::CapabilityUnavailable)?;
        if output.state() == ContextState::Suspended {
            output.resume()?;
            tracing::info!("Audio output resumed");
        }
        Ok(output)
    }
}

/// Error text including its source chain
fn describe(error: &SoundError) -> String {
    let mut text = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    text
}

/// Subscription of a [`SoundSystem`] to a [`SoundBus`]
pub struct BusListener {
    bus: SoundBus,
    id: SubscriberId,
    thread: Option<JoinHandle<()>>,
}

impl BusListener {
    /// Unsubscribe and wait for the listener thread to finish
    pub fn detach(mut self) {
        self.bus.unsubscribe(self.id);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for BusListener {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

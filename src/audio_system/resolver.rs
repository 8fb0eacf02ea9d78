//! Resolution cache
//!
//! Each sound name moves `Unresolved → Resolving → Resolved`. The first
//! caller for a name runs the resolution; callers arriving while it is in
//! flight block on the same slot and share its outcome. A failed attempt
//! leaves the name unresolved so a later call can try again.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::pcm::PcmBuffer;
use super::source::SoundName;
use crate::error::SoundError;

/// Backend chosen for a name at resolution time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Fully decoded PCM in memory
    Buffered,

    /// Encoded bytes decoded at play time
    Streaming,

    /// Procedural generator
    Synthesized,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Buffered => "buffered",
            Backend::Streaming => "streaming",
            Backend::Synthesized => "synthesized",
        };
        write!(f, "{}", name)
    }
}

/// Playable form of a sound
pub enum ResolvedSound {
    Buffered(PcmBuffer),
    Streaming(Arc<[u8]>),
    Synthesized,
}

impl ResolvedSound {
    pub fn backend(&self) -> Backend {
        match self {
            ResolvedSound::Buffered(_) => Backend::Buffered,
            ResolvedSound::Streaming(_) => Backend::Streaming,
            ResolvedSound::Synthesized => Backend::Synthesized,
        }
    }
}

impl fmt::Debug for ResolvedSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedSound::Buffered(pcm) => write!(f, "Buffered({:?})", pcm.duration()),
            ResolvedSound::Streaming(bytes) => write!(f, "Streaming({} bytes)", bytes.len()),
            ResolvedSound::Synthesized => write!(f, "Synthesized"),
        }
    }
}

/// Observable per-name state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    Resolving,
    Resolved(Backend),
}

/// An in-flight resolution that waiters block on
#[derive(Default)]
struct Pending {
    // None while running; Some(None) on failure
    outcome: Mutex<Option<Option<Arc<ResolvedSound>>>>,
    ready: Condvar,
}

impl Pending {
    fn wait(&self) -> Option<Arc<ResolvedSound>> {
        let mut outcome = self.outcome.lock();
        while outcome.is_none() {
            self.ready.wait(&mut outcome);
        }
        outcome.clone().flatten()
    }

    fn complete(&self, result: Option<Arc<ResolvedSound>>) {
        let mut outcome = self.outcome.lock();
        if outcome.is_none() {
            *outcome = Some(result);
            self.ready.notify_all();
        }
    }
}

enum Slot {
    Resolving(Arc<Pending>),
    Resolved(Arc<ResolvedSound>),
}

/// Per-name resolution state, at most one entry per name
#[derive(Default)]
pub struct ResolutionCache {
    slots: Mutex<HashMap<SoundName, Slot>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached entry for `name`, or run `resolve` exactly once
    /// across all concurrent callers and cache its success.
    ///
    /// Waiters that shared a failed attempt get [`SoundError::Unresolvable`];
    /// the caller that ran the attempt gets its actual error.
    pub fn resolve_with<F>(&self, name: SoundName, resolve: F) -> Result<Arc<ResolvedSound>, SoundError>
    where
        F: FnOnce() -> Result<ResolvedSound, SoundError>,
    {
        let pending = {
            let mut slots = self.slots.lock();
            match slots.get(&name) {
                Some(Slot::Resolved(sound)) => return Ok(Arc::clone(sound)),
                Some(Slot::Resolving(pending)) => {
                    let pending = Arc::clone(pending);
                    drop(slots);
                    tracing::debug!("Waiting on in-flight resolution of {}", name);
                    return pending
                        .wait()
                        .ok_or_else(|| SoundError::Unresolvable(name.to_string()));
                }
                None => {
                    let pending = Arc::new(Pending::default());
                    slots.insert(name, Slot::Resolving(Arc::clone(&pending)));
                    pending
                }
            }
        };

        let mut attempt = Attempt {
            cache: self,
            name,
            pending,
            finished: false,
        };
        let result = resolve().map(Arc::new);
        attempt.finish(result.as_ref().ok().cloned());
        result
    }

    /// Cached entry, if resolved
    pub fn get(&self, name: SoundName) -> Option<Arc<ResolvedSound>> {
        match self.slots.lock().get(&name) {
            Some(Slot::Resolved(sound)) => Some(Arc::clone(sound)),
            _ => None,
        }
    }

    pub fn state(&self, name: SoundName) -> ResolutionState {
        match self.slots.lock().get(&name) {
            None => ResolutionState::Unresolved,
            Some(Slot::Resolving(_)) => ResolutionState::Resolving,
            Some(Slot::Resolved(sound)) => ResolutionState::Resolved(sound.backend()),
        }
    }

    /// Forget `name`. An attempt already in flight still completes for its
    /// waiters but its result is not cached.
    pub fn invalidate(&self, name: SoundName) -> bool {
        self.slots.lock().remove(&name).is_some()
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// Number of resolved names
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Resolved(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Publishes the outcome of one attempt, including when the resolver panics
struct Attempt<'a> {
    cache: &'a ResolutionCache,
    name: SoundName,
    pending: Arc<Pending>,
    finished: bool,
}

impl Attempt<'_> {
    fn finish(&mut self, result: Option<Arc<ResolvedSound>>) {
        self.finished = true;
        {
            let mut slots = self.cache.slots.lock();
            // Only touch the slot if it is still ours (not invalidated meanwhile)
            let ours = matches!(
                slots.get(&self.name),
                Some(Slot::Resolving(p)) if Arc::ptr_eq(p, &self.pending)
            );
            if ours {
                match &result {
                    Some(sound) => {
                        slots.insert(self.name, Slot::Resolved(Arc::clone(sound)));
                    }
                    None => {
                        slots.remove(&self.name);
                    }
                }
            }
        }
        self.pending.complete(result);
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(None);
        }
    }
}

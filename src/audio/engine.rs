//! Audio engine and its process-wide handle
//!
//! The engine owns the single playback session. All state transitions happen
//! under one lock; stream resolution runs with the lock released and the
//! state is re-checked before committing, so a slow resolution never blocks
//! concurrent commands and never leaves the state half-updated.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use super::backend::{PlayerBackend, ProcessPlayer};
use super::resolver::{HttpResolver, StreamResolver};
use super::AudioError;

/// What a play command did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackOutcome {
    /// A session for the reference is now active
    Started,
    /// The reference was already playing; playback was toggled off
    ToggledOff,
}

/// Snapshot of the actuator state for status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStatus {
    pub current: Option<String>,
    pub playing: bool,
}

/// State guarded by the engine lock: the backend and the reference it is
/// playing
struct EngineState {
    backend: Box<dyn PlayerBackend>,
    current: Option<String>,
}

impl EngineState {
    /// Whether `reference` is the active session
    fn is_playing(&mut self, reference: &str) -> bool {
        self.current.as_deref() == Some(reference) && self.backend.is_active()
    }

    fn halt(&mut self) {
        if let Err(e) = self.backend.stop() {
            warn!(?e, "player stop failed");
        }
        self.current = None;
    }
}

/// The audio actuator. One instance exists per process.
pub struct AudioEngine {
    resolver: Box<dyn StreamResolver>,
    state: Mutex<EngineState>,
}

impl AudioEngine {
    pub fn new(resolver: Box<dyn StreamResolver>, backend: Box<dyn PlayerBackend>) -> Self {
        Self {
            resolver,
            state: Mutex::new(EngineState {
                backend,
                current: None,
            }),
        }
    }

    /// Play `reference`, with toggle semantics.
    ///
    /// If `reference` is already the active session the call stops playback
    /// and clears the current reference. Otherwise the reference is resolved
    /// (outside the lock) and, once confirmed resolvable, replaces the
    /// previous session. On resolution failure the previous session is left
    /// untouched.
    pub async fn play(&self, reference: &str) -> Result<PlaybackOutcome, AudioError> {
        {
            let mut state = self.state.lock().await;
            if state.is_playing(reference) {
                info!(reference, "toggling playback off");
                state.halt();
                return Ok(PlaybackOutcome::ToggledOff);
            }
        }

        // Resolution is slow network I/O; the lock stays released so other
        // commands are not serialized behind it.
        let stream_url = self.resolver.resolve(reference).await?;

        let mut state = self.state.lock().await;

        // A concurrent command may have won the race while we resolved
        if state.is_playing(reference) {
            info!(reference, "toggling playback off");
            state.halt();
            return Ok(PlaybackOutcome::ToggledOff);
        }

        if let Err(e) = state.backend.start(&stream_url) {
            // The backend replaces sessions on start, so a failed start means
            // nothing is playing; record that rather than a phantom session.
            state.current = None;
            return Err(e);
        }
        state.current = Some(reference.to_string());

        info!(reference, "playback started");
        Ok(PlaybackOutcome::Started)
    }

    /// Unconditionally halt playback and clear the current reference. Safe
    /// to call when nothing is playing.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if state.current.is_some() {
            info!("playback stopped");
        }
        state.halt();
    }

    /// Current actuator state
    pub async fn status(&self) -> AudioStatus {
        let mut state = self.state.lock().await;
        AudioStatus {
            playing: state.current.is_some() && state.backend.is_active(),
            current: state.current.clone(),
        }
    }
}

/// Lazily-initialized handle to the process-wide engine.
///
/// Construction is deferred to the first play command and guarded so that
/// concurrent first calls build exactly one engine. The handle is created in
/// `main` and passed by reference to the coordinator.
pub struct AudioHandle {
    cell: OnceCell<Arc<AudioEngine>>,
    player_command: Vec<String>,
    resolve_timeout: Duration,
}

impl AudioHandle {
    pub fn new(player_command: Vec<String>, resolve_timeout: Duration) -> Self {
        Self {
            cell: OnceCell::new(),
            player_command,
            resolve_timeout,
        }
    }

    /// Handle wrapping an already-built engine, for driving the pipeline
    /// against mock resolvers and backends
    #[cfg(test)]
    pub(crate) fn with_engine(engine: Arc<AudioEngine>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(engine)),
            player_command: Vec::new(),
            resolve_timeout: Duration::ZERO,
        }
    }

    async fn engine(&self) -> Result<&Arc<AudioEngine>, AudioError> {
        self.cell
            .get_or_try_init(|| async {
                info!("initializing audio engine");
                let resolver = HttpResolver::new(self.resolve_timeout)?;
                let backend = ProcessPlayer::new(self.player_command.clone())?;
                Ok(Arc::new(AudioEngine::new(
                    Box::new(resolver),
                    Box::new(backend),
                )))
            })
            .await
    }

    pub async fn play(&self, reference: &str) -> Result<PlaybackOutcome, AudioError> {
        self.engine().await?.play(reference).await
    }

    /// Stop playback. A handle whose engine was never built has nothing to
    /// stop.
    pub async fn stop(&self) -> Result<(), AudioError> {
        if let Some(engine) = self.cell.get() {
            engine.stop().await;
        }
        Ok(())
    }

    pub async fn status(&self) -> AudioStatus {
        match self.cell.get() {
            Some(engine) => engine.status().await,
            None => AudioStatus {
                current: None,
                playing: false,
            },
        }
    }
}

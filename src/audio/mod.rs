//! Audio actuator
//!
//! One engine per process controls a single playback session: a play command
//! resolves its reference to a streamable URL, replaces any previous session,
//! and repeating the same command while it is active toggles playback off.

mod backend;
mod engine;
mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{PlayerBackend, ProcessPlayer};
pub use engine::{AudioEngine, AudioHandle, AudioStatus, PlaybackOutcome};
pub use resolver::{HttpResolver, StreamResolver};

use thiserror::Error;

/// Errors raised by the audio actuator
#[derive(Debug, Error)]
pub enum AudioError {
    /// The reference could not be resolved to a playable stream. The
    /// previous session, if any, is left untouched.
    #[error("failed to resolve stream for '{reference}': {message}")]
    Resolution { reference: String, message: String },

    /// The player process could not be started or controlled
    #[error("player backend error: {0}")]
    Backend(String),

    /// Engine construction failed
    #[error("audio engine initialization failed: {0}")]
    Init(String),
}

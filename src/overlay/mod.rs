//! Screen overlay actuator
//!
//! A dedicated render thread steers the displayed tint toward a lock-guarded
//! target at a fixed cadence. Command handlers only ever touch the target;
//! the loop owns the currently-displayed values outright.

mod controller;
mod surface;

pub use controller::{OverlayCommands, OverlayController, OverlayHandle, OverlayTarget};
pub use surface::{BroadcastSurface, OverlaySurface};

use thiserror::Error;

/// Errors raised by the overlay actuator
#[derive(Debug, Error)]
pub enum OverlayError {
    /// The visual resource could not be brought up; the pipeline continues
    /// without visual actuation
    #[error("overlay resource unavailable: {0}")]
    Unavailable(String),

    /// A surface update failed; retried on the next tick
    #[error("surface update failed: {0}")]
    Surface(String),
}

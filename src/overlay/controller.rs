//! Overlay render loop and its command handle
//!
//! The controller spawns a named OS thread running the render loop. Callers
//! mutate only the lock-guarded target; the loop diffs the target against
//! its own current values each tick and applies color first, then opacity.
//! The command path never waits on rendering.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::surface::OverlaySurface;
use super::OverlayError;
use crate::presets::Color;

/// Tint the loop steers toward
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayTarget {
    pub color: Color,
    pub opacity: f64,
}

impl Default for OverlayTarget {
    fn default() -> Self {
        Self {
            color: Color::from_hex("#BBDDFF").expect("default overlay color is well-formed"),
            opacity: 0.0,
        }
    }
}

/// State shared between the command path and the render thread
struct Shared {
    target: Mutex<OverlayTarget>,
    running: AtomicBool,
}

impl Shared {
    /// A poisoned lock only means a writer panicked mid-update; the target
    /// is two plain values and stays usable.
    fn target(&self) -> MutexGuard<'_, OverlayTarget> {
        self.target.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Starts the render loop and hands out the command handle
pub struct OverlayController;

impl OverlayController {
    /// Spawn the render thread over `surface`, ticking at `tick`.
    ///
    /// Fails with `OverlayError::Unavailable` when the thread cannot be
    /// created; callers continue without visual actuation.
    pub fn start<S: OverlaySurface + 'static>(
        tick: Duration,
        surface: S,
    ) -> Result<OverlayHandle, OverlayError> {
        let shared = Arc::new(Shared {
            target: Mutex::new(OverlayTarget::default()),
            running: AtomicBool::new(true),
        });

        let thread = thread::Builder::new()
            .name("overlay-render".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                move || render_loop(shared, surface, tick)
            })
            .map_err(|e| OverlayError::Unavailable(e.to_string()))?;

        Ok(OverlayHandle {
            shared,
            thread: Some(thread),
        })
    }
}

/// Cloneable command-path view of the overlay: writes targets, never waits
/// on the render thread
#[derive(Clone)]
pub struct OverlayCommands {
    shared: Arc<Shared>,
}

impl OverlayCommands {
    /// Update the target tint. Non-blocking: returns as soon as the target
    /// is written; the loop picks it up on its next tick.
    pub fn set_target(&self, color: Color, opacity: f64) {
        let mut target = self.shared.target();
        target.color = color;
        target.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Fade the overlay out by targeting zero opacity
    pub fn turn_off(&self) {
        self.shared.target().opacity = 0.0;
    }

    /// Snapshot of the current target
    pub fn target(&self) -> OverlayTarget {
        self.shared.target().clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

/// Owning handle for the running overlay; holds the render thread
pub struct OverlayHandle {
    shared: Arc<Shared>,
    thread: Option<thread::JoinHandle<()>>,
}

impl OverlayHandle {
    /// The command-path view handed to the coordinator
    pub fn commands(&self) -> OverlayCommands {
        OverlayCommands {
            shared: Arc::clone(&self.shared),
        }
    }

    /// See [`OverlayCommands::set_target`]
    pub fn set_target(&self, color: Color, opacity: f64) {
        self.commands().set_target(color, opacity);
    }

    /// See [`OverlayCommands::turn_off`]
    pub fn turn_off(&self) {
        self.commands().turn_off();
    }

    pub fn target(&self) -> OverlayTarget {
        self.shared.target().clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Signal loop termination and wait for the surface to be released
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("overlay render thread panicked");
            }
        }
    }
}

impl Drop for OverlayHandle {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }
}

fn render_loop<S: OverlaySurface>(shared: Arc<Shared>, mut surface: S, tick: Duration) {
    info!("overlay render loop started");

    // Owned by this thread alone; the lock covers only the target
    let mut current = OverlayTarget::default();

    while shared.running.load(Ordering::SeqCst) {
        let target = shared.target().clone();

        if target.color != current.color {
            match surface.apply_color(&target.color) {
                Ok(()) => current.color = target.color,
                Err(e) => warn!(?e, "overlay color update failed"),
            }
        }

        if target.opacity != current.opacity {
            match surface.apply_opacity(target.opacity) {
                Ok(()) => current.opacity = target.opacity,
                Err(e) => warn!(?e, "overlay opacity update failed"),
            }
        }

        thread::sleep(tick);
    }

    surface.close();
    info!("overlay render loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const TICK: Duration = Duration::from_millis(5);

    /// Surface recording every applied operation in order
    #[derive(Clone, Default)]
    struct RecordingSurface {
        ops: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicUsize>,
    }

    impl RecordingSurface {
        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }
    }

    impl OverlaySurface for RecordingSurface {
        fn apply_color(&mut self, color: &Color) -> Result<(), OverlayError> {
            self.ops.lock().unwrap().push(format!("color:{}", color));
            Ok(())
        }

        fn apply_opacity(&mut self, opacity: f64) -> Result<(), OverlayError> {
            self.ops.lock().unwrap().push(format!("opacity:{:.2}", opacity));
            Ok(())
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached within deadline");
    }

    #[test]
    fn test_opacity_is_clamped() {
        let surface = RecordingSurface::default();
        let mut handle = OverlayController::start(TICK, surface).unwrap();

        handle.set_target(Color::from_hex("#FFCCAA").unwrap(), 1.7);
        assert_eq!(handle.target().opacity, 1.0);

        handle.set_target(Color::from_hex("#FFCCAA").unwrap(), -0.3);
        assert_eq!(handle.target().opacity, 0.0);

        handle.stop();
    }

    #[test]
    fn test_turn_off_zeroes_opacity() {
        let surface = RecordingSurface::default();
        let mut handle = OverlayController::start(TICK, surface).unwrap();

        handle.set_target(Color::from_hex("#AACCFF").unwrap(), 0.16);
        handle.turn_off();
        assert_eq!(handle.target().opacity, 0.0);

        handle.stop();
    }

    #[test]
    fn test_loop_applies_color_then_opacity() {
        let surface = RecordingSurface::default();
        let probe = surface.clone();
        let mut handle = OverlayController::start(TICK, surface).unwrap();

        handle.set_target(Color::from_hex("#AACCFF").unwrap(), 0.16);
        wait_for(|| probe.ops().len() >= 2);
        handle.stop();

        let ops = probe.ops();
        assert_eq!(ops[0], "color:#AACCFF");
        assert_eq!(ops[1], "opacity:0.16");
    }

    #[test]
    fn test_unchanged_target_is_not_reapplied() {
        let surface = RecordingSurface::default();
        let probe = surface.clone();
        let mut handle = OverlayController::start(TICK, surface).unwrap();

        handle.set_target(Color::from_hex("#AACCFF").unwrap(), 0.16);
        wait_for(|| probe.ops().len() >= 2);

        // Let several more ticks pass with the same target
        thread::sleep(TICK * 10);
        handle.stop();

        assert_eq!(probe.ops().len(), 2);
    }

    #[test]
    fn test_stop_closes_surface_once_and_restart_works() {
        let surface = RecordingSurface::default();
        let probe = surface.clone();
        let mut handle = OverlayController::start(TICK, surface).unwrap();

        handle.stop();
        assert!(!handle.is_running());
        assert_eq!(probe.closed.load(Ordering::SeqCst), 1);

        // A fresh surface comes up cleanly after the previous loop released
        let surface = RecordingSurface::default();
        let probe = surface.clone();
        let mut handle = OverlayController::start(TICK, surface).unwrap();
        handle.set_target(Color::from_hex("#FFF4CC").unwrap(), 0.10);
        wait_for(|| !probe.ops().is_empty());
        handle.stop();
        assert_eq!(probe.closed.load(Ordering::SeqCst), 1);
    }
}

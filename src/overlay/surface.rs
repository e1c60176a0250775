//! Overlay surfaces
//!
//! The render loop draws through this trait. The production surface pushes
//! frames onto the daemon's event channel; the subscribed overlay client
//! does the actual on-screen rendering.

use tokio::sync::broadcast;
use tracing::debug;

use super::OverlayError;
use crate::events::StateEvent;
use crate::presets::Color;

/// A drawable overlay resource owned by the render loop
pub trait OverlaySurface: Send {
    fn apply_color(&mut self, color: &Color) -> Result<(), OverlayError>;

    fn apply_opacity(&mut self, opacity: f64) -> Result<(), OverlayError>;

    /// Release the resource; called once when the loop exits
    fn close(&mut self);
}

/// Production surface: publishes each applied frame as an `OverlayFrame`
/// event for the renderer client
pub struct BroadcastSurface {
    events: broadcast::Sender<StateEvent>,
    color: Color,
    opacity: f64,
}

impl BroadcastSurface {
    pub fn new(events: broadcast::Sender<StateEvent>) -> Self {
        Self {
            events,
            color: Color::from_hex("#BBDDFF").expect("default overlay color is well-formed"),
            opacity: 0.0,
        }
    }

    fn publish(&self) {
        // No receivers just means no renderer is attached yet
        let _ = self.events.send(StateEvent::OverlayFrame {
            color: self.color.clone(),
            opacity: self.opacity,
        });
    }
}

impl OverlaySurface for BroadcastSurface {
    fn apply_color(&mut self, color: &Color) -> Result<(), OverlayError> {
        self.color = color.clone();
        self.publish();
        Ok(())
    }

    fn apply_opacity(&mut self, opacity: f64) -> Result<(), OverlayError> {
        self.opacity = opacity;
        self.publish();
        Ok(())
    }

    fn close(&mut self) {
        debug!("overlay surface closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_reach_subscribers() {
        let (tx, mut rx) = broadcast::channel(16);
        let mut surface = BroadcastSurface::new(tx);

        surface
            .apply_color(&Color::from_hex("#AACCFF").unwrap())
            .unwrap();
        surface.apply_opacity(0.16).unwrap();

        let first = rx.try_recv().unwrap();
        assert!(matches!(first, StateEvent::OverlayFrame { .. }));

        let second = rx.try_recv().unwrap();
        match second {
            StateEvent::OverlayFrame { color, opacity } => {
                assert_eq!(color.as_str(), "#AACCFF");
                assert_eq!(opacity, 0.16);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let (tx, _) = broadcast::channel(16);
        let mut surface = BroadcastSurface::new(tx);
        assert!(surface.apply_opacity(0.5).is_ok());
    }
}

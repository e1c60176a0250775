//! Events emitted by the pipeline and actuators
//!
//! Broadcast to subscribed IPC clients; the overlay renderer client draws
//! `OverlayFrame` events, everything else is informational.

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifiedState;
use crate::presets::{Color, IntensityCategory};

/// Events emitted while dispatching states and driving the actuators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// A telemetry sample or command resolved to a state
    StateClassified {
        state: ClassifiedState,
        category: IntensityCategory,
    },

    /// Audio session started for a track
    AudioStarted { track: String },

    /// Repeated play command toggled the active track off
    AudioToggledOff { track: String },

    /// Playback halted unconditionally
    AudioStopped,

    /// The render loop applied a new color/opacity frame
    OverlayFrame { color: Color, opacity: f64 },
}

impl std::fmt::Display for StateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateEvent::StateClassified { state, category } => {
                write!(f, "STATE_CLASSIFIED ({} -> {})", state, category)
            }
            StateEvent::AudioStarted { track } => write!(f, "AUDIO_STARTED ({})", track),
            StateEvent::AudioToggledOff { track } => write!(f, "AUDIO_TOGGLED_OFF ({})", track),
            StateEvent::AudioStopped => write!(f, "AUDIO_STOPPED"),
            StateEvent::OverlayFrame { color, opacity } => {
                write!(f, "OVERLAY_FRAME ({} @ {:.2})", color, opacity)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = StateEvent::AudioStarted {
            track: "https://example.com/focus".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("audio_started"));
        assert!(json.contains("focus"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"state_classified","state":"focused","category":"focused"}"#;
        let event: StateEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, StateEvent::StateClassified { .. }));
    }

    #[test]
    fn test_overlay_frame_round_trip() {
        let event = StateEvent::OverlayFrame {
            color: Color::from_hex("#BBDDFF").unwrap(),
            opacity: 0.14,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: StateEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, StateEvent::OverlayFrame { opacity, .. } if opacity == 0.14));
    }
}

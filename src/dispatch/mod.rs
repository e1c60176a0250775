//! Dispatch coordination
//!
//! Takes a classified state (or a raw label from outside), looks up its
//! preset, and issues independent commands to the audio and overlay
//! actuators. Actuator failures are caught here and merged into a
//! per-actuator report; one actuator failing never suppresses the other's
//! command. All mutual exclusion lives in the actuators.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioHandle, AudioStatus, PlaybackOutcome};
use crate::classifier::{ClassifiedState, StateClassifier};
use crate::events::StateEvent;
use crate::overlay::OverlayCommands;
use crate::presets::{IntensityCategory, PresetTable};
use crate::telemetry::{FeatureVector, SignalError};

/// Outcome of one actuator command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ActuatorResult {
    /// Command applied
    Applied,
    /// Repeated audio command toggled playback off
    Toggled,
    /// Actuator is not available in this process
    Unavailable,
    /// Command failed; the other actuator was still driven
    Failed { message: String },
}

impl ActuatorResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, ActuatorResult::Failed { .. })
    }
}

/// Merged result of dispatching one state to both actuators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    pub state: ClassifiedState,
    pub category: IntensityCategory,
    pub audio: ActuatorResult,
    pub overlay: ActuatorResult,
}

/// Result of an unconditional stop across both actuators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopReport {
    pub audio: ActuatorResult,
    pub overlay: ActuatorResult,
}

/// Drives both actuators from classified states
pub struct Coordinator {
    classifier: StateClassifier,
    presets: Arc<PresetTable>,
    audio: AudioHandle,
    overlay: Option<OverlayCommands>,
    events: broadcast::Sender<StateEvent>,
}

impl Coordinator {
    pub fn new(
        classifier: StateClassifier,
        presets: Arc<PresetTable>,
        audio: AudioHandle,
        overlay: Option<OverlayCommands>,
        events: broadcast::Sender<StateEvent>,
    ) -> Self {
        Self {
            classifier,
            presets,
            audio,
            overlay,
            events,
        }
    }

    /// Run the full pipeline for a telemetry payload: aggregate, classify,
    /// dispatch. A malformed payload is the caller's error; a classifier
    /// failure falls back to the default state.
    pub async fn classify_and_dispatch(
        &self,
        payload: &serde_json::Value,
    ) -> Result<DispatchReport, SignalError> {
        let features = FeatureVector::from_payload(payload)?;
        Ok(self.dispatch_features(&features).await)
    }

    /// Classify an already-built feature vector and dispatch the result
    pub async fn dispatch_features(&self, features: &FeatureVector) -> DispatchReport {
        let state = match self.classifier.classify(features) {
            Ok(state) => state,
            Err(e) => {
                warn!(?e, fallback = %ClassifiedState::DEFAULT, "classification failed");
                ClassifiedState::DEFAULT
            }
        };
        self.apply(state).await
    }

    /// Dispatch a raw state label from outside. Total: unrecognized labels
    /// fall back to the default preset rather than erroring.
    pub async fn set_state(&self, label: &str) -> DispatchReport {
        let state = ClassifiedState::from_label(label);
        if state == ClassifiedState::Unknown {
            debug!(label, "unrecognized state label, using default preset");
        }
        self.apply(state).await
    }

    /// Look up the preset for `state` and drive both actuators
    pub async fn apply(&self, state: ClassifiedState) -> DispatchReport {
        let (category, preset) = self.presets.lookup(state);
        info!(%state, %category, "dispatching state");

        self.emit(StateEvent::StateClassified { state, category });

        let audio = match self.audio.play(&preset.track).await {
            Ok(PlaybackOutcome::Started) => {
                self.emit(StateEvent::AudioStarted {
                    track: preset.track.clone(),
                });
                ActuatorResult::Applied
            }
            Ok(PlaybackOutcome::ToggledOff) => {
                self.emit(StateEvent::AudioToggledOff {
                    track: preset.track.clone(),
                });
                ActuatorResult::Toggled
            }
            Err(e) => {
                error!(?e, track = %preset.track, "audio dispatch failed");
                ActuatorResult::Failed {
                    message: e.to_string(),
                }
            }
        };

        let overlay = match &self.overlay {
            Some(overlay) => {
                overlay.set_target(preset.color.clone(), preset.opacity);
                ActuatorResult::Applied
            }
            None => ActuatorResult::Unavailable,
        };

        DispatchReport {
            state,
            category,
            audio,
            overlay,
        }
    }

    /// Halt audio and fade out the overlay. Safe when nothing is active.
    pub async fn stop_all(&self) -> StopReport {
        let audio = match self.audio.stop().await {
            Ok(()) => {
                self.emit(StateEvent::AudioStopped);
                ActuatorResult::Applied
            }
            Err(e) => {
                error!(?e, "audio stop failed");
                ActuatorResult::Failed {
                    message: e.to_string(),
                }
            }
        };

        let overlay = match &self.overlay {
            Some(overlay) => {
                overlay.turn_off();
                ActuatorResult::Applied
            }
            None => ActuatorResult::Unavailable,
        };

        info!("actuators stopped");
        StopReport { audio, overlay }
    }

    /// Audio actuator snapshot for status reporting
    pub async fn audio_status(&self) -> AudioStatus {
        self.audio.status().await
    }

    /// Whether visual actuation is available
    pub fn overlay_available(&self) -> bool {
        self.overlay.as_ref().is_some_and(|o| o.is_running())
    }

    fn emit(&self, event: StateEvent) {
        // Send only fails when no subscriber is connected
        let _ = self.events.send(event);
    }
}

//! Attentional state classification
//!
//! Wraps the pre-loaded focus model. The model is loaded once at process
//! start and reused for every classification; a failed inference surfaces as
//! `ClassifierError` and the caller falls back to the default state.

mod model;

pub use model::{FocusModel, ModelError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::telemetry::FeatureVector;

/// Discrete attentional-state labels the pipeline recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifiedState {
    Focused,
    HighlyFocused,
    Distracted,
    HighlyDistracted,
    Tired,
    Relaxed,
    Calm,
    Anxious,
    Stressed,
    /// Label outside the recognized set
    Unknown,
}

impl ClassifiedState {
    /// Fallback state used when classification fails or a label is invalid
    pub const DEFAULT: ClassifiedState = ClassifiedState::Focused;

    /// Parse a raw label. Total: unrecognized strings map to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "focused" => Self::Focused,
            "highly_focused" => Self::HighlyFocused,
            "distracted" => Self::Distracted,
            "highly_distracted" => Self::HighlyDistracted,
            "tired" => Self::Tired,
            "relaxed" => Self::Relaxed,
            "calm" => Self::Calm,
            "anxious" => Self::Anxious,
            "stressed" => Self::Stressed,
            _ => Self::Unknown,
        }
    }

    /// The wire label for this state
    pub fn label(&self) -> &'static str {
        match self {
            Self::Focused => "focused",
            Self::HighlyFocused => "highly_focused",
            Self::Distracted => "distracted",
            Self::HighlyDistracted => "highly_distracted",
            Self::Tired => "tired",
            Self::Relaxed => "relaxed",
            Self::Calm => "calm",
            Self::Anxious => "anxious",
            Self::Stressed => "stressed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ClassifiedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors raised during classification
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Classifier over a pre-loaded focus model
pub struct StateClassifier {
    model: FocusModel,
}

impl StateClassifier {
    pub fn new(model: FocusModel) -> Self {
        Self { model }
    }

    /// Classify a feature vector into a state label.
    ///
    /// Deterministic for a fixed model. A model failure or a label that does
    /// not round-trip into the recognized set is an error; callers fall back
    /// to `ClassifiedState::DEFAULT` rather than propagating.
    pub fn classify(&self, features: &FeatureVector) -> Result<ClassifiedState, ClassifierError> {
        let label = self
            .model
            .infer(features)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let state = ClassifiedState::from_label(label);
        if state == ClassifiedState::Unknown {
            return Err(ClassifierError::Inference(format!(
                "model returned unrecognized label '{}'",
                label
            )));
        }

        debug!(%state, "classified feature vector");
        Ok(state)
    }
}

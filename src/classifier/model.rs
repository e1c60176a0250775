//! Focus model loading and inference
//!
//! The model is a nearest-centroid table: per-feature scale divisors plus one
//! centroid per state label. Inference scales the input vector and returns
//! the label of the closest centroid. Labels are compared in sorted order
//! with strict less-than, so ties resolve deterministically.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::ClassifiedState;
use crate::telemetry::FeatureVector;

/// Number of features the model consumes, in `FeatureVector::as_array` order
pub const FEATURE_COUNT: usize = 10;

/// Default model shipped with the daemon
const DEFAULT_MODEL: &str = include_str!("default_model.json");

/// Errors raised while loading or running the model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid model: {0}")]
    Invalid(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// On-disk model representation
#[derive(Debug, Deserialize)]
struct ModelSpec {
    /// Per-feature divisors applied before distance computation
    scales: Vec<f64>,
    /// One centroid per label, in raw (unscaled) feature units
    centroids: BTreeMap<String, Vec<f64>>,
}

/// A loaded, validated focus model. Constructed once at process start.
#[derive(Debug)]
pub struct FocusModel {
    scales: [f64; FEATURE_COUNT],
    /// Scaled centroids, sorted by label
    centroids: Vec<(String, [f64; FEATURE_COUNT])>,
}

impl FocusModel {
    /// Load the model from `path`, or the built-in default when `path` is None
    pub fn load(path: Option<&Path>) -> Result<Self, ModelError> {
        let spec: ModelSpec = match path {
            Some(p) => {
                info!(path = %p.display(), "loading focus model");
                serde_json::from_str(&std::fs::read_to_string(p)?)?
            }
            None => {
                info!("loading built-in focus model");
                serde_json::from_str(DEFAULT_MODEL)?
            }
        };
        Self::from_spec(spec)
    }

    fn from_spec(spec: ModelSpec) -> Result<Self, ModelError> {
        if spec.scales.len() != FEATURE_COUNT {
            return Err(ModelError::Invalid(format!(
                "expected {} scale entries, got {}",
                FEATURE_COUNT,
                spec.scales.len()
            )));
        }
        if spec.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(ModelError::Invalid(
                "scale entries must be finite and positive".to_string(),
            ));
        }
        if spec.centroids.is_empty() {
            return Err(ModelError::Invalid("centroid table is empty".to_string()));
        }

        let mut scales = [0.0; FEATURE_COUNT];
        scales.copy_from_slice(&spec.scales);

        let mut centroids = Vec::with_capacity(spec.centroids.len());
        for (label, values) in spec.centroids {
            if ClassifiedState::from_label(&label) == ClassifiedState::Unknown {
                return Err(ModelError::Invalid(format!(
                    "centroid label '{}' is not a recognized state",
                    label
                )));
            }
            if values.len() != FEATURE_COUNT {
                return Err(ModelError::Invalid(format!(
                    "centroid '{}' has {} values, expected {}",
                    label,
                    values.len(),
                    FEATURE_COUNT
                )));
            }
            let mut scaled = [0.0; FEATURE_COUNT];
            for (i, v) in values.iter().enumerate() {
                scaled[i] = v / scales[i];
            }
            centroids.push((label, scaled));
        }

        Ok(Self { scales, centroids })
    }

    /// Classify a feature vector, returning the nearest centroid's label.
    ///
    /// Deterministic: identical vectors always produce identical labels.
    pub fn infer(&self, features: &FeatureVector) -> Result<&str, ModelError> {
        let raw = features.as_array();
        let mut scaled = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            scaled[i] = raw[i] / self.scales[i];
        }

        let mut best: Option<(&str, f64)> = None;
        for (label, centroid) in &self.centroids {
            let dist: f64 = scaled
                .iter()
                .zip(centroid.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            if !dist.is_finite() {
                return Err(ModelError::Inference(format!(
                    "non-finite distance to centroid '{}'",
                    label
                )));
            }
            match best {
                Some((_, d)) if dist >= d => {}
                _ => best = Some((label, dist)),
            }
        }

        best.map(|(label, _)| label)
            .ok_or_else(|| ModelError::Inference("centroid table is empty".to_string()))
    }
}

//! Telemetry aggregation
//!
//! Normalizes loosely-structured typing/mouse/gaze/idle payloads into the
//! fixed-order feature vector the classifier consumes. Absent fields default
//! to zero; a non-numeric value where a number is expected is rejected with
//! the offending field name.

use serde_json::Value;
use thiserror::Error;

/// Errors raised while reading a telemetry payload
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("invalid signal value for field '{field}': expected a number")]
    InvalidSignal { field: String },
}

/// Fixed-order numeric encoding of one telemetry sample.
///
/// Field order matches the classifier's expected input order and must not be
/// reordered.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    pub mean_inter_key_interval: f64,
    pub key_interval_variance: f64,
    pub burstiness: f64,
    pub total_keys: f64,
    pub backspace_rate: f64,
    pub backspace_count: f64,
    pub mouse_distance: f64,
    pub click_rate: f64,
    pub mouse_clicks: f64,
    pub idle_time_ms: f64,
}

impl FeatureVector {
    /// Build a feature vector from a raw telemetry payload.
    ///
    /// Expected shape (all parts optional):
    /// `{typing: {mean_iki_ms, variance_iki, burstiness, total_keys,
    /// backspace_rate, backspaces}, mouse: {distance_px, click_rate_per_sec,
    /// mouse_clicks}, gaze: {..}, idle_time_ms}`. Gaze metrics are accepted
    /// but not part of the vector.
    pub fn from_payload(payload: &Value) -> Result<Self, SignalError> {
        let typing = payload.get("typing");
        let mouse = payload.get("mouse");

        Ok(Self {
            mean_inter_key_interval: numeric_field(typing, "typing", "mean_iki_ms")?,
            key_interval_variance: numeric_field(typing, "typing", "variance_iki")?,
            burstiness: numeric_field(typing, "typing", "burstiness")?,
            total_keys: numeric_field(typing, "typing", "total_keys")?,
            backspace_rate: numeric_field(typing, "typing", "backspace_rate")?,
            backspace_count: numeric_field(typing, "typing", "backspaces")?,
            mouse_distance: numeric_field(mouse, "mouse", "distance_px")?,
            click_rate: numeric_field(mouse, "mouse", "click_rate_per_sec")?,
            mouse_clicks: numeric_field(mouse, "mouse", "mouse_clicks")?,
            idle_time_ms: numeric_value(payload.get("idle_time_ms"), "idle_time_ms")?,
        })
    }

    /// The vector in classifier input order
    pub fn as_array(&self) -> [f64; 10] {
        [
            self.mean_inter_key_interval,
            self.key_interval_variance,
            self.burstiness,
            self.total_keys,
            self.backspace_rate,
            self.backspace_count,
            self.mouse_distance,
            self.click_rate,
            self.mouse_clicks,
            self.idle_time_ms,
        ]
    }
}

/// Read `section.key` from the payload, defaulting to 0 when absent
fn numeric_field(section: Option<&Value>, name: &str, key: &str) -> Result<f64, SignalError> {
    let value = section.and_then(|s| s.get(key));
    numeric_value(value, &format!("{}.{}", name, key))
}

/// Coerce a JSON value to f64. Missing and null both read as 0.
fn numeric_value(value: Option<&Value>, field: &str) -> Result<f64, SignalError> {
    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(v) => v.as_f64().ok_or_else(|| SignalError::InvalidSignal {
            field: field.to_string(),
        }),
    }
}

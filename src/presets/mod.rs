//! State-to-preset mapping
//!
//! Pure lookup tables from classified state to intensity category and from
//! category to actuation preset. Built once at startup and shared by
//! reference; never mutated at runtime. Every input state maps to a preset —
//! unmapped states fall back to the focused category.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::ClassifiedState;

/// Error raised while parsing a color value
#[derive(Debug, Error)]
#[error("invalid color '{0}': expected #RRGGBB")]
pub struct ColorParseError(String);

/// A `#RRGGBB` screen tint color
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError(hex.to_string()));
        }
        Ok(Self(format!("#{}", digits.to_ascii_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized actuation intensity, shared by several raw states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityCategory {
    Focused,
    DeepWork,
    Relaxed,
    CalmRecovery,
}

impl std::fmt::Display for IntensityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Focused => "focused",
            Self::DeepWork => "deep_work",
            Self::Relaxed => "relaxed",
            Self::CalmRecovery => "calm_recovery",
        };
        f.write_str(name)
    }
}

/// Visual and audio target for one intensity category
#[derive(Debug, Clone, PartialEq)]
pub struct ActuationPreset {
    pub color: Color,
    /// Always within [0, 1]
    pub opacity: f64,
    /// Audio reference handed to the audio actuator for resolution
    pub track: String,
}

impl ActuationPreset {
    fn new(color: &str, opacity: f64, track: &str) -> Self {
        Self {
            color: Color::from_hex(color).expect("preset table colors are well-formed"),
            opacity: opacity.clamp(0.0, 1.0),
            track: track.to_string(),
        }
    }
}

/// Immutable deploy-time preset table
#[derive(Debug)]
pub struct PresetTable {
    focused: ActuationPreset,
    deep_work: ActuationPreset,
    relaxed: ActuationPreset,
    calm_recovery: ActuationPreset,
}

impl Default for PresetTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PresetTable {
    /// The deploy-time table: colors and opacities per category, plus the
    /// stream references each category plays.
    pub fn builtin() -> Self {
        Self {
            focused: ActuationPreset::new(
                "#BBDDFF",
                0.14,
                "https://www.youtube.com/watch?v=jfKfPfyJRdk",
            ),
            deep_work: ActuationPreset::new(
                "#AACCFF",
                0.16,
                "https://www.youtube.com/watch?v=RqzGzwTY-6w",
            ),
            relaxed: ActuationPreset::new(
                "#FFCCAA",
                0.20,
                "https://www.youtube.com/watch?v=t_28251qQnU",
            ),
            // No visual preset exists for anxious/stressed: the overlay goes
            // dark while the calm-recovery track plays.
            calm_recovery: ActuationPreset::new(
                "#BBDDFF",
                0.0,
                "https://www.youtube.com/watch?v=lTRiuFIWV54",
            ),
        }
    }

    /// Map a state to its intensity category. Total: states without an
    /// explicit mapping escalate to `Focused`.
    pub fn category_for(&self, state: ClassifiedState) -> IntensityCategory {
        match state {
            ClassifiedState::Focused => IntensityCategory::Focused,
            ClassifiedState::HighlyFocused => IntensityCategory::DeepWork,
            // Distraction forces deep focus
            ClassifiedState::Distracted => IntensityCategory::DeepWork,
            ClassifiedState::HighlyDistracted => IntensityCategory::DeepWork,
            ClassifiedState::Tired => IntensityCategory::Relaxed,
            ClassifiedState::Relaxed => IntensityCategory::Relaxed,
            ClassifiedState::Calm => IntensityCategory::Relaxed,
            ClassifiedState::Anxious => IntensityCategory::CalmRecovery,
            ClassifiedState::Stressed => IntensityCategory::CalmRecovery,
            ClassifiedState::Unknown => IntensityCategory::Focused,
        }
    }

    /// The preset for a category
    pub fn preset(&self, category: IntensityCategory) -> &ActuationPreset {
        match category {
            IntensityCategory::Focused => &self.focused,
            IntensityCategory::DeepWork => &self.deep_work,
            IntensityCategory::Relaxed => &self.relaxed,
            IntensityCategory::CalmRecovery => &self.calm_recovery,
        }
    }

    /// Category and preset for a state in one step
    pub fn lookup(&self, state: ClassifiedState) -> (IntensityCategory, &ActuationPreset) {
        let category = self.category_for(state);
        (category, self.preset(category))
    }
}

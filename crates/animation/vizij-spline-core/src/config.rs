//! Configuration for curve fitting and bulk evaluation.

use serde::{Deserialize, Serialize};

/// Half a percent.
pub const DEFAULT_SCALE_TOLERANCE: f32 = 0.005;
/// 0.5 degrees in radians.
pub const DEFAULT_ROTATE_TOLERANCE: f32 = 0.00873;
pub const DEFAULT_TRANSLATE_TOLERANCE: f32 = 0.01;
/// 0.5 degrees in radians.
pub const DEFAULT_DERIVATIVE_ANGLE_TOLERANCE: f32 = 0.00873;
/// 10 degrees in radians.
pub const DEFAULT_REPEAT_DERIVATIVE_ANGLE_TOLERANCE: f32 = 0.1745;

/// Maximum reconstruction error per operation category.
///
/// Derivative tolerances are angles (radians) between slopes, since the
/// magnitude of a slope is not perceived linearly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    pub scale: f32,
    pub rotate: f32,
    pub translate: f32,
    pub derivative_angle: f32,
    /// Looser threshold used only to decide whether a clip loops.
    pub repeat_derivative_angle: f32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE_TOLERANCE,
            rotate: DEFAULT_ROTATE_TOLERANCE,
            translate: DEFAULT_TRANSLATE_TOLERANCE,
            derivative_angle: DEFAULT_DERIVATIVE_ANGLE_TOLERANCE,
            repeat_derivative_angle: DEFAULT_REPEAT_DERIVATIVE_ANGLE_TOLERANCE,
        }
    }
}

/// Whether a finished clip should loop back to its start.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatPreference {
    Never,
    #[default]
    IfRepeatable,
    Always,
}

/// Configuration for fitting a rig's channels into splines.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub tolerances: Tolerances,
    pub repeat_preference: RepeatPreference,
    /// Keep source times instead of shifting the earliest animated time to tick 0.
    pub preserve_start_time: bool,
    /// Let channels end at different times instead of extending them to the latest end.
    pub stagger_end_times: bool,
    /// Stop descending into a bone's children once the bone has animation.
    pub root_bones_only: bool,
    /// Samples taken per key interval when reading keyed source curves.
    pub samples_per_key_interval: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            repeat_preference: RepeatPreference::IfRepeatable,
            preserve_start_time: false,
            stagger_end_times: false,
            root_bones_only: false,
            samples_per_key_interval: 16,
        }
    }
}

/// Sizing and defaults for `BulkSplineEvaluator`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Number of slots allocated up front.
    pub initial_indices: usize,
    /// Value reported by slots with no spline.
    pub default_value: f32,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            initial_indices: 0,
            default_value: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: FitConfig =
            serde_json::from_str(r#"{ "tolerances": { "rotate": 0.02 }, "root_bones_only": true }"#)
                .unwrap();
        assert_eq!(cfg.tolerances.rotate, 0.02);
        assert_eq!(cfg.tolerances.scale, DEFAULT_SCALE_TOLERANCE);
        assert!(cfg.root_bones_only);
        assert_eq!(cfg.repeat_preference, RepeatPreference::IfRepeatable);
        assert_eq!(cfg.samples_per_key_interval, 16);
    }
}

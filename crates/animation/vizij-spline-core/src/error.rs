//! Error types for spline construction, curve fitting and evaluation.

use serde::{Deserialize, Serialize};

/// Structural violations reported by the spline core.
///
/// Precision-loss conditions (negative start times, ignored extra curves) are
/// not errors; they are logged with `log::warn!` and processing continues.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SplineError {
    /// Node appended before the previous node.
    #[error("Node at x={x} is earlier than the previous node at x={last_x}")]
    NodeOutOfOrder { x: f32, last_x: f32 },

    /// Node appended to a full spline.
    #[error("Spline capacity of {capacity} nodes exceeded")]
    CapacityExceeded { capacity: usize },

    /// Value rejected because it falls outside the spline's y range.
    #[error("Value {y} is outside the spline range [{start}, {end}]")]
    ValueOutOfRange { y: f32, start: f32, end: f32 },

    /// Nodes added before `CompactSpline::init`.
    #[error("Spline must be initialized before nodes are added")]
    SplineNotInitialized,

    /// Too few samples to build a cubic.
    #[error("Curve fitting needs at least {required} samples, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    /// Bone index outside the rig.
    #[error("Bone {bone} is out of range (rig has {len} bones)")]
    BoneOutOfRange { bone: usize, len: usize },

    /// Channel index outside a bone's channel list.
    #[error("Channel {channel} is out of range (bone has {len} channels)")]
    ChannelOutOfRange { channel: usize, len: usize },

    /// Evaluator slot outside the index table.
    #[error("Index {index} is out of range (evaluator has {len} indices)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Parent bone must come before its child.
    #[error("Bone {bone} cannot have parent {parent}; parents must precede children")]
    InvalidParent { bone: usize, parent: usize },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl SplineError {
    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::NodeOutOfOrder { .. }
            | Self::CapacityExceeded { .. }
            | Self::ValueOutOfRange { .. }
            | Self::SplineNotInitialized
            | Self::InsufficientSamples { .. } => "structure",
            Self::BoneOutOfRange { .. }
            | Self::ChannelOutOfRange { .. }
            | Self::IndexOutOfRange { .. } => "index",
            Self::InvalidParent { .. } => "hierarchy",
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for SplineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = SplineError::NodeOutOfOrder { x: 1.0, last_x: 2.0 };
        assert_eq!(err.category(), "structure");

        let err = SplineError::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(err.category(), "index");

        let err = SplineError::InvalidParent { bone: 1, parent: 3 };
        assert_eq!(err.category(), "hierarchy");
    }

    #[test]
    fn test_serialization() {
        let error = SplineError::CapacityExceeded { capacity: 8 };
        let serialized = serde_json::to_string(&error).unwrap();
        let deserialized: SplineError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(error, deserialized);
    }

    #[test]
    fn json_errors_convert() {
        let err: SplineError = serde_json::from_str::<f32>("not json").unwrap_err().into();
        assert!(matches!(err, SplineError::Serialization { .. }));
    }
}

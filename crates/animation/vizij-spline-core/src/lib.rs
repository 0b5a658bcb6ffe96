//! Vizij Spline Core (engine-agnostic)
//!
//! Compresses dense animation samples into compact piecewise-cubic splines and
//! evaluates many such splines at once at runtime.
//!
//! Data flows sample provider -> [`fit`] -> [`CompactSpline`] -> [`BulkSplineEvaluator`].
//! The fitter works per channel (one scalar operation of one bone), then merges
//! and drops channels per bone, and finally packs everything into a [`RigAnim`].

pub mod compact_spline;
pub mod config;
pub mod cubic;
pub mod error;
pub mod evaluator;
pub mod fit;
pub mod ids;
pub mod ops;
pub mod range;
pub mod rig_anim;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, SplineError>;

// Re-exports for consumers (importers and runtimes)
pub use compact_spline::{AddMode, CompactSpline, CompactSplineNode};
pub use config::{EvaluatorConfig, FitConfig, RepeatPreference, Tolerances};
pub use cubic::{CubicCurve, CubicInit};
pub use error::SplineError;
pub use evaluator::{BulkSplineEvaluator, SplinePlayback};
pub use fit::{AnimOp, Channel, ChannelSource, KeyedCurve, RigBuilder, SplineNode};
pub use ids::{BoneIndex, MatrixOpId, Tick};
pub use ops::{
    MatrixOpArray, MatrixOperationInit, MatrixOperationType, OperationValue, RotationOrder,
};
pub use range::{Range, ANGLE_RANGE};
pub use rig_anim::{
    create_compact_spline, export_rig_anim_json, parse_rig_anim_json, BoneAnim, MatrixOpAnim,
    OpValue, RigAnim,
};

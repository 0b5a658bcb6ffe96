//! Curve fitting: dense samples in, minimal spline nodes out.
//!
//! - [`curve`]: adaptive subdivision of one sample stream.
//! - [`simplify`]: node pruning and per-bone channel merging.
//! - [`gather`]: sampling of keyed importer curves.
//! - [`rig`]: the bone arena and the passes that produce a [`RigAnim`](crate::RigAnim).

pub mod curve;
pub mod gather;
pub mod rig;
pub mod simplify;

pub use curve::{derivative_angle, fit_curve, fit_samples, Channel, Samples, SplineNode};
pub use gather::{constant_value, gather_curve, AnimOp, ChannelSource, KeyedCurve};
pub use rig::{bone_base_name, Bone, RigBuilder};
pub use simplify::{
    equal_nodes, evaluate_nodes, intermediate_nodes_redundant, is_default_value, prune_channels,
    prune_nodes, sum_channels, sum_nodes, summable_channel, uniform_scale_channels,
};

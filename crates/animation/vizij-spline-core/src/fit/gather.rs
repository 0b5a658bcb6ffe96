//! Sampling keyed source curves into the fitter.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::ids::Tick;
use crate::ops::MatrixOperationType;
use crate::Result;

use super::curve::{derivative_angle, fit_samples, Samples, SplineNode};
use super::simplify::prune_nodes;

/// A keyframed scalar curve supplied by an importer.
///
/// Times are in ticks, values and slopes in the operation's units (radians for
/// rotations). Slopes are per tick.
pub trait KeyedCurve {
    fn num_keys(&self) -> usize;
    fn key_time(&self, key: usize) -> Tick;
    fn key_value(&self, key: usize) -> f32;
    fn key_left_derivative(&self, key: usize) -> f32;
    fn key_right_derivative(&self, key: usize) -> f32;
    fn evaluate(&self, time: Tick) -> f32;
    fn evaluate_left_derivative(&self, time: Tick) -> f32;
    fn evaluate_right_derivative(&self, time: Tick) -> f32;
}

/// Where a channel's data comes from.
pub enum ChannelSource<'a> {
    /// Unanimated property value.
    Constant(f32),
    /// Animated curves. Only the first is used.
    Curves(Vec<&'a dyn KeyedCurve>),
}

/// Operation a source property drives, and whether the property is applied
/// inverted (e.g. a pivot that is undone after rotating about it).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimOp {
    pub op: MatrixOperationType,
    #[serde(default)]
    pub invert: bool,
}

impl AnimOp {
    pub const fn new(op: MatrixOperationType) -> Self {
        Self { op, invert: false }
    }

    pub const fn inverted(op: MatrixOperationType) -> Self {
        Self { op, invert: true }
    }

    /// Inverse of a scale is its reciprocal; every other operation negates.
    #[inline]
    pub fn apply_value(&self, value: f32) -> f32 {
        if !self.invert {
            value
        } else if self.op.is_scale() {
            1.0 / value
        } else {
            -value
        }
    }

    /// Slope of `apply_value` given the source value and slope.
    #[inline]
    pub fn apply_derivative(&self, value: f32, derivative: f32) -> f32 {
        if !self.invert {
            derivative
        } else if self.op.is_scale() {
            -derivative / (value * value)
        } else {
            -derivative
        }
    }
}

/// Value of the curve if it never moves: every key within `tolerance` of the
/// first and every key slope within `derivative_angle_tolerance` of flat.
pub fn constant_value(
    curve: &dyn KeyedCurve,
    op: AnimOp,
    tolerance: f32,
    derivative_angle_tolerance: f32,
) -> Option<f32> {
    let num_keys = curve.num_keys();
    if num_keys == 0 {
        return Some(op.apply_value(curve.evaluate(0)));
    }

    let first_raw = curve.key_value(0);
    let first = op.apply_value(first_raw);
    let flat = |raw_value: f32, raw_derivative: f32| {
        let d = op.apply_derivative(raw_value, raw_derivative);
        derivative_angle(d).abs() <= derivative_angle_tolerance
    };
    for key in 0..num_keys - 1 {
        let raw = curve.key_value(key);
        let next = op.apply_value(curve.key_value(key + 1));
        if !flat(raw, curve.key_left_derivative(key))
            || !flat(raw, curve.key_right_derivative(key))
            || (next - first).abs() > tolerance
        {
            return None;
        }
    }
    Some(first)
}

/// Sample every key interval of `curve` and fit the samples onto `nodes`, then
/// prune.
///
/// Each interval gets `samples_per_key_interval` evenly spaced integer-tick
/// samples (fewer when the interval is shorter than that many ticks). The first
/// sample of an interval uses the key's outgoing slope so broken tangents are
/// preserved.
pub fn gather_curve(
    curve: &dyn KeyedCurve,
    op: AnimOp,
    samples_per_key_interval: usize,
    tolerance: f32,
    derivative_angle_tolerance: f32,
    nodes: &mut Vec<SplineNode>,
) -> Result<()> {
    let num_keys = curve.num_keys();
    let mut times = Vec::with_capacity(samples_per_key_interval);
    let mut values = Vec::with_capacity(samples_per_key_interval);
    let mut derivatives = Vec::with_capacity(samples_per_key_interval);

    for key in 0..num_keys.saturating_sub(1) {
        let start = curve.key_time(key);
        let end = curve.key_time(key + 1);
        let width = i64::from(end) - i64::from(start);
        let count = samples_per_key_interval
            .min(usize::try_from(width + 1).unwrap_or(2))
            .max(2);

        times.clear();
        values.clear();
        derivatives.clear();
        for i in 0..count {
            let offset = width * i as i64 / (count as i64 - 1);
            let t = (i64::from(start) + offset) as Tick;
            let raw = curve.evaluate(t);
            let raw_derivative = if i == 0 {
                curve.evaluate_right_derivative(t)
            } else {
                curve.evaluate_left_derivative(t)
            };
            times.push(t);
            values.push(op.apply_value(raw));
            derivatives.push(op.apply_derivative(raw, raw_derivative));
        }

        debug!(
            "key {}: t={} v={} d={}",
            key, times[0], values[0], derivatives[0]
        );
        let samples = Samples::new(&times, &values, &derivatives)?;
        fit_samples(&samples, tolerance, nodes);
    }

    prune_nodes(nodes, tolerance, derivative_angle_tolerance);
    Ok(())
}

/// First curve of a multi-curve source, warning when others are dropped.
pub(crate) fn first_curve<'a>(
    curves: &[&'a dyn KeyedCurve],
    op: MatrixOperationType,
) -> Option<&'a dyn KeyedCurve> {
    if curves.len() > 1 {
        warn!(
            "{} has {} curves; only using the first one",
            op.name(),
            curves.len()
        );
    }
    curves.first().copied()
}

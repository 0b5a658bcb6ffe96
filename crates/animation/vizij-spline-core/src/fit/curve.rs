//! Adaptive subdivision of a dense sample stream into spline nodes.

use serde::{Deserialize, Serialize};

use crate::config::Tolerances;
use crate::cubic::{CubicCurve, CubicInit};
use crate::error::SplineError;
use crate::ids::{MatrixOpId, Tick};
use crate::ops::MatrixOperationType;
use crate::Result;

/// Control point of a cubic spline, before quantization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SplineNode {
    pub time: Tick,
    pub val: f32,
    pub derivative: f32,
}

impl SplineNode {
    pub const fn new(time: Tick, val: f32, derivative: f32) -> Self {
        Self {
            time,
            val,
            derivative,
        }
    }
}

/// Angle of a slope in x/y space, in radians within `(-pi/2, pi/2)`.
///
/// Slopes are compared by angle: the difference between slopes 100 and 101 is
/// invisible while the difference between 0 and 1 is not.
#[inline]
pub fn derivative_angle(derivative: f32) -> f32 {
    derivative.atan()
}

/// One scalar animated quantity of one bone.
///
/// A channel with exactly one node is constant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub op: MatrixOperationType,
    pub id: MatrixOpId,
    pub nodes: Vec<SplineNode>,
}

impl Channel {
    pub fn new(op: MatrixOperationType, id: MatrixOpId) -> Self {
        Self {
            op,
            id,
            nodes: Vec::new(),
        }
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        self.nodes.len() <= 1
    }

    #[inline]
    pub fn tolerance(&self, tolerances: &Tolerances) -> f32 {
        self.op.tolerance(tolerances)
    }

    pub fn start_time(&self) -> Option<Tick> {
        self.nodes.first().map(|n| n.time)
    }

    pub fn end_time(&self) -> Option<Tick> {
        self.nodes.last().map(|n| n.time)
    }

    /// Replace all nodes with a single constant node at time 0.
    pub fn set_constant(&mut self, value: f32) {
        self.nodes.clear();
        self.nodes.push(SplineNode::new(0, value, 0.0));
    }
}

/// Dense samples of one channel: parallel arrays of time, value and slope.
#[derive(Clone, Copy, Debug)]
pub struct Samples<'a> {
    times: &'a [Tick],
    values: &'a [f32],
    derivatives: &'a [f32],
}

impl<'a> Samples<'a> {
    /// Wrap parallel sample arrays. Times must be non-decreasing.
    pub fn new(times: &'a [Tick], values: &'a [f32], derivatives: &'a [f32]) -> Result<Self> {
        let len = times.len().min(values.len()).min(derivatives.len());
        debug_assert!(
            times.len() == values.len() && values.len() == derivatives.len(),
            "sample arrays differ in length"
        );
        if len < 2 {
            return Err(SplineError::InsufficientSamples {
                required: 2,
                actual: len,
            });
        }
        Ok(Self {
            times: &times[..len],
            values: &values[..len],
            derivatives: &derivatives[..len],
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[inline]
    fn node(&self, i: usize) -> SplineNode {
        SplineNode::new(self.times[i], self.values[i], self.derivatives[i])
    }

    #[inline]
    fn sub(&self, start: usize, end_inclusive: usize) -> Self {
        Self {
            times: &self.times[start..=end_inclusive],
            values: &self.values[start..=end_inclusive],
            derivatives: &self.derivatives[start..=end_inclusive],
        }
    }
}

/// Fit cubic segments to `samples` and append their nodes to `nodes`.
///
/// A cubic is built from the first and last samples. If an interior sample is
/// off by `tolerance` or more, the range is split at the worst sample and both
/// halves are fitted independently. A start node identical to the last node
/// already in `nodes` is not pushed again, so consecutive calls (one per key
/// interval, say) join up.
pub fn fit_samples(samples: &Samples<'_>, tolerance: f32, nodes: &mut Vec<SplineNode>) {
    let last = samples.len() - 1;
    let start = samples.node(0);
    let end = samples.node(last);
    let cubic = CubicCurve::new(&CubicInit::new(
        start.val,
        start.derivative,
        end.val,
        end.derivative,
        (end.time - start.time) as f32,
    ));

    let mut worst_idx = 0;
    let mut worst_diff = 0.0f32;
    for i in 1..last {
        let x = (samples.times[i] - start.time) as f32;
        let diff = (cubic.evaluate(x) - samples.values[i]).abs();
        if diff > worst_diff {
            worst_idx = i;
            worst_diff = diff;
        }
    }

    if worst_idx > 0 && worst_diff >= tolerance {
        fit_samples(&samples.sub(0, worst_idx), tolerance, nodes);
        fit_samples(&samples.sub(worst_idx, last), tolerance, nodes);
        return;
    }

    if nodes.last() != Some(&start) {
        nodes.push(start);
    }
    nodes.push(end);
}

/// Fit parallel sample arrays into a fresh node list.
pub fn fit_curve(
    times: &[Tick],
    values: &[f32],
    derivatives: &[f32],
    tolerance: f32,
) -> Result<Vec<SplineNode>> {
    let samples = Samples::new(times, values, derivatives)?;
    let mut nodes = Vec::new();
    fit_samples(&samples, tolerance, &mut nodes);
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_needs_two_nodes() {
        let nodes = fit_curve(&[0, 10, 20], &[0.0, 5.0, 10.0], &[0.5, 0.5, 0.5], 0.1).unwrap();
        assert_eq!(
            nodes,
            vec![SplineNode::new(0, 0.0, 0.5), SplineNode::new(20, 10.0, 0.5)]
        );
    }

    #[test]
    fn too_few_samples_is_an_error() {
        let err = fit_curve(&[0], &[1.0], &[0.0], 0.1).unwrap_err();
        assert_eq!(
            err,
            SplineError::InsufficientSamples {
                required: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn split_point_is_shared_not_duplicated() {
        // Triangle: up then down. The peak cannot be reproduced by one cubic.
        let times = [0, 5, 10, 15, 20];
        let values = [0.0, 5.0, 10.0, 5.0, 0.0];
        let derivs = [1.0, 1.0, 0.0, -1.0, -1.0];
        let nodes = fit_curve(&times, &values, &derivs, 0.01).unwrap();
        assert_eq!(nodes.first().map(|n| n.time), Some(0));
        assert_eq!(nodes.last().map(|n| n.time), Some(20));
        assert!(nodes.iter().any(|n| n.time == 10));
        for pair in nodes.windows(2) {
            assert!(pair[0] != pair[1]);
        }
    }
}

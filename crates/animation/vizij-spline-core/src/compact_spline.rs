//! Compact spline storage.
//!
//! Nodes are quantized to 6 bytes each: x as a 16-bit multiple of the spline's
//! `x_granularity`, y as a 16-bit fraction of the spline's `y_range`, and the
//! slope as a 16-bit angle in `(-pi/2, pi/2)`. Large casts of simultaneously
//! playing splines stay small in memory; evaluation happens in
//! `BulkSplineEvaluator` on dequantized node pairs.

use std::f32::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::cubic::CubicInit;
use crate::error::SplineError;
use crate::range::Range;
use crate::Result;

const MAX_X: f32 = u16::MAX as f32;
const MAX_Y: f32 = u16::MAX as f32;
const MAX_ANGLE: f32 = i16::MAX as f32;

/// What to do with a value outside the spline's y range.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddMode {
    /// Reject the node with `SplineError::ValueOutOfRange`.
    #[default]
    Reject,
    /// Clamp the value into the y range.
    Clamp,
}

/// One quantized node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactSplineNode {
    x: u16,
    y: u16,
    angle: i16,
}

impl CompactSplineNode {
    #[inline]
    pub fn x_quantized(&self) -> u16 {
        self.x
    }

    #[inline]
    pub fn y_quantized(&self) -> u16 {
        self.y
    }

    #[inline]
    pub fn angle_quantized(&self) -> i16 {
        self.angle
    }
}

/// Ordered, appendable sequence of quantized nodes with a fixed capacity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompactSpline {
    y_range: Range,
    x_granularity: f32,
    capacity: usize,
    nodes: Vec<CompactSplineNode>,
}

impl CompactSpline {
    /// Allocate room for `capacity` nodes. Call `init` before adding nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            y_range: Range::empty(),
            x_granularity: 0.0,
            capacity,
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Set the value range and time granularity. Clears any existing nodes.
    pub fn init(&mut self, y_range: Range, x_granularity: f32) {
        debug_assert!(x_granularity > 0.0, "x_granularity must be positive");
        self.y_range = y_range;
        self.x_granularity = x_granularity;
        self.nodes.clear();
    }

    /// Granularity that spreads `max_x` over the full 16-bit x resolution.
    pub fn recommend_x_granularity(max_x: f32) -> f32 {
        if max_x <= 0.0 {
            1.0
        } else {
            max_x / MAX_X
        }
    }

    /// Append a node. Nodes must arrive in non-decreasing x order.
    pub fn add_node(&mut self, x: f32, y: f32, derivative: f32, mode: AddMode) -> Result<()> {
        if !(self.x_granularity > 0.0) {
            return Err(SplineError::SplineNotInitialized);
        }
        if self.nodes.len() >= self.capacity {
            return Err(SplineError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let y = if self.y_range.contains(y) {
            y
        } else {
            match mode {
                AddMode::Clamp => self.y_range.clamp(y),
                AddMode::Reject => {
                    return Err(SplineError::ValueOutOfRange {
                        y,
                        start: self.y_range.start(),
                        end: self.y_range.end(),
                    })
                }
            }
        };

        let node = CompactSplineNode {
            x: self.quantize_x(x),
            y: self.quantize_y(y),
            angle: quantize_angle(derivative),
        };
        if let Some(last) = self.nodes.last() {
            if node.x < last.x {
                return Err(SplineError::NodeOutOfOrder {
                    x,
                    last_x: self.dequantize_x(last.x),
                });
            }
        }
        self.nodes.push(node);
        Ok(())
    }

    #[inline]
    pub fn y_range(&self) -> Range {
        self.y_range
    }

    #[inline]
    pub fn x_granularity(&self) -> f32 {
        self.x_granularity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn nodes(&self) -> &[CompactSplineNode] {
        &self.nodes
    }

    #[inline]
    pub fn node_x(&self, index: usize) -> f32 {
        self.dequantize_x(self.nodes[index].x)
    }

    #[inline]
    pub fn node_y(&self, index: usize) -> f32 {
        self.dequantize_y(self.nodes[index].y)
    }

    #[inline]
    pub fn node_derivative(&self, index: usize) -> f32 {
        dequantize_angle(self.nodes[index].angle)
    }

    pub fn start_x(&self) -> f32 {
        self.nodes.first().map_or(0.0, |n| self.dequantize_x(n.x))
    }

    pub fn end_x(&self) -> f32 {
        self.nodes.last().map_or(0.0, |n| self.dequantize_x(n.x))
    }

    pub fn start_y(&self) -> f32 {
        self.nodes.first().map_or(0.0, |n| self.dequantize_y(n.y))
    }

    pub fn end_y(&self) -> f32 {
        self.nodes.last().map_or(0.0, |n| self.dequantize_y(n.y))
    }

    #[inline]
    pub fn length_x(&self) -> f32 {
        self.end_x() - self.start_x()
    }

    /// Number of segments a cursor can sit on. Single-node splines still have one
    /// (degenerate) segment.
    #[inline]
    pub fn num_segments(&self) -> usize {
        self.nodes.len().saturating_sub(1).max(1)
    }

    /// Segment `i` such that `node_x(i) <= x < node_x(i + 1)`, starting the search
    /// at `guess`. Cursors move a little each frame, so the guessed segment or a
    /// neighbour is almost always the answer; otherwise fall back to a binary search.
    /// `x` before the start maps to the first segment, at or after the end to the last.
    pub fn index_for_x(&self, x: f32, guess: usize) -> usize {
        let n = self.nodes.len();
        if n < 2 {
            return 0;
        }
        let last = n - 2;
        let qx = x / self.x_granularity;

        let guess = guess.min(last);
        if self.segment_contains(guess, qx) {
            return guess;
        }
        if guess < last && self.segment_contains(guess + 1, qx) {
            return guess + 1;
        }
        if guess > 0 && self.segment_contains(guess - 1, qx) {
            return guess - 1;
        }

        let upper = self.nodes.partition_point(|node| f32::from(node.x) <= qx);
        upper.saturating_sub(1).min(last)
    }

    /// Endpoint conditions of segment `index`, in local x starting at 0.
    pub fn segment_init(&self, index: usize) -> CubicInit {
        let n = self.nodes.len();
        if n < 2 {
            let y = self.start_y();
            return CubicInit::new(y, 0.0, y, 0.0, 0.0);
        }
        let i = index.min(n - 2);
        CubicInit::new(
            self.node_y(i),
            self.node_derivative(i),
            self.node_y(i + 1),
            self.node_derivative(i + 1),
            self.node_x(i + 1) - self.node_x(i),
        )
    }

    #[inline]
    fn segment_contains(&self, index: usize, qx: f32) -> bool {
        f32::from(self.nodes[index].x) <= qx && qx < f32::from(self.nodes[index + 1].x)
    }

    #[inline]
    fn quantize_x(&self, x: f32) -> u16 {
        (x / self.x_granularity).round().clamp(0.0, MAX_X) as u16
    }

    #[inline]
    fn dequantize_x(&self, x: u16) -> f32 {
        f32::from(x) * self.x_granularity
    }

    #[inline]
    fn quantize_y(&self, y: f32) -> u16 {
        (self.y_range.percent(y).clamp(0.0, 1.0) * MAX_Y).round() as u16
    }

    #[inline]
    fn dequantize_y(&self, y: u16) -> f32 {
        if self.y_range.length() > 0.0 {
            self.y_range.lerp(f32::from(y) / MAX_Y)
        } else {
            self.y_range.start()
        }
    }
}

#[inline]
fn quantize_angle(derivative: f32) -> i16 {
    (derivative.atan() / FRAC_PI_2 * MAX_ANGLE)
        .round()
        .clamp(-MAX_ANGLE, MAX_ANGLE) as i16
}

#[inline]
fn dequantize_angle(angle: i16) -> f32 {
    (f32::from(angle) / MAX_ANGLE * FRAC_PI_2).tan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_quantization_keeps_common_slopes() {
        for d in [0.0f32, 0.5, -0.5, 1.0, -2.0, 10.0] {
            let back = dequantize_angle(quantize_angle(d));
            let tol = 1e-3 * (1.0 + d * d);
            assert!((back - d).abs() <= tol, "slope {d} came back as {back}");
        }
        assert_eq!(quantize_angle(0.0), 0);
    }

    #[test]
    fn degenerate_y_range_stores_its_start() {
        let mut s = CompactSpline::with_capacity(2);
        s.init(Range::new(3.0, 3.0), 1.0);
        s.add_node(0.0, 3.0, 0.25, AddMode::Reject).unwrap();
        assert_eq!(s.node_y(0), 3.0);
    }
}

//! Closed numeric intervals used for spline value ranges and modular arithmetic.
//!
//! A range with `start > end` is invalid. Invalid ranges double as "no range":
//! an evaluator slot with an invalid y range performs no modular normalization.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// Interval `[start, end]` over `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    start: f32,
    end: f32,
}

/// Normalized range for angles, `(-pi, pi]`.
pub const ANGLE_RANGE: Range = Range { start: -PI, end: PI };

impl Default for Range {
    fn default() -> Self {
        Self::empty()
    }
}

impl Range {
    #[inline]
    pub const fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    /// Range that contains nothing. `include` grows it to the first value.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            start: f32::INFINITY,
            end: f32::NEG_INFINITY,
        }
    }

    /// Range that contains every finite value.
    #[inline]
    pub const fn full() -> Self {
        Self {
            start: f32::NEG_INFINITY,
            end: f32::INFINITY,
        }
    }

    #[inline]
    pub fn start(&self) -> f32 {
        self.start
    }

    #[inline]
    pub fn end(&self) -> f32 {
        self.end
    }

    #[inline]
    pub fn valid(&self) -> bool {
        self.start <= self.end
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.end - self.start
    }

    #[inline]
    pub fn middle(&self) -> f32 {
        0.5 * (self.start + self.end)
    }

    /// Check if a value is within this range (inclusive)
    #[inline]
    pub fn contains(&self, x: f32) -> bool {
        self.start <= x && x <= self.end
    }

    #[inline]
    pub fn clamp(&self, x: f32) -> f32 {
        x.max(self.start).min(self.end)
    }

    /// Return the smallest range that holds both `self` and `x`.
    #[inline]
    pub fn include(&self, x: f32) -> Self {
        Self {
            start: self.start.min(x),
            end: self.end.max(x),
        }
    }

    /// Overlap of two ranges; invalid when they are disjoint.
    #[inline]
    pub fn intersect(&self, other: &Range) -> Self {
        Self {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        }
    }

    /// Distance from `x` to the nearest point of the range. Zero inside.
    #[inline]
    pub fn distance_from(&self, x: f32) -> f32 {
        if x < self.start {
            self.start - x
        } else if x > self.end {
            x - self.end
        } else {
            0.0
        }
    }

    /// Value at `percent` of the way from start to end.
    #[inline]
    pub fn lerp(&self, percent: f32) -> f32 {
        self.start + percent * self.length()
    }

    /// Inverse of `lerp`. Degenerate ranges map everything to 0.
    #[inline]
    pub fn percent(&self, x: f32) -> f32 {
        let len = self.length();
        if len > 0.0 {
            (x - self.start) / len
        } else {
            0.0
        }
    }

    /// Bring a value that is at most one range length outside `(start, end]` back
    /// inside by adding or subtracting the length. Never clamps.
    #[inline]
    pub fn normalize_close_value(&self, x: f32) -> f32 {
        let len = self.length();
        let normalized = if x > self.end {
            x - len
        } else if x <= self.start {
            x + len
        } else {
            x
        };
        debug_assert!(
            len <= 0.0 || (normalized > self.start - len && normalized <= self.end + len),
            "value {x} too far outside range for close normalization"
        );
        normalized
    }

    /// Normalize an arbitrary value into `(start, end]` by whole multiples of the length.
    pub fn normalize_wildly_outside_value(&self, x: f32) -> f32 {
        let len = self.length();
        if len <= 0.0 || !x.is_finite() {
            return x;
        }
        let wrapped = self.start + (x - self.start).rem_euclid(len);
        if wrapped <= self.start {
            wrapped + len
        } else {
            wrapped
        }
    }
}

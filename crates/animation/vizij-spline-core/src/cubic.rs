//! Cubic polynomials in Hermite form.
//!
//! A segment is described by its endpoint values and slopes over a local window
//! `[0, width_x]`:
//!
//! ```text
//! c(x) = c0 + c1*x + c2*x^2 + c3*x^3
//!
//! c0 = start_y
//! c1 = start_derivative
//! c2 = (3*(end_y - start_y) - width_x*(2*start_derivative + end_derivative)) / width_x^2
//! c3 = (2*(start_y - end_y) + width_x*(start_derivative + end_derivative)) / width_x^3
//! ```
//!
//! Keeping the window local (starting at 0) instead of absolute time preserves
//! float precision for segments far from the origin.

use serde::{Deserialize, Serialize};

/// Endpoint conditions for a cubic segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CubicInit {
    pub start_y: f32,
    pub start_derivative: f32,
    pub end_y: f32,
    pub end_derivative: f32,
    pub width_x: f32,
}

impl CubicInit {
    pub fn new(
        start_y: f32,
        start_derivative: f32,
        end_y: f32,
        end_derivative: f32,
        width_x: f32,
    ) -> Self {
        Self {
            start_y,
            start_derivative,
            end_y,
            end_derivative,
            width_x,
        }
    }
}

/// `c0 + c1*x + c2*x^2 + c3*x^3`
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CubicCurve {
    coeff: [f32; 4],
}

impl CubicCurve {
    /// Unique cubic that matches value and slope at both ends of the window.
    /// A zero-width window degenerates to the line through the start value with
    /// the start slope.
    pub fn new(init: &CubicInit) -> Self {
        let w = init.width_x;
        if w == 0.0 {
            return Self {
                coeff: [init.start_y, init.start_derivative, 0.0, 0.0],
            };
        }
        let w2 = w * w;
        let w3 = w2 * w;
        let dy = init.end_y - init.start_y;
        let c2 = (3.0 * dy - w * (2.0 * init.start_derivative + init.end_derivative)) / w2;
        let c3 = (-2.0 * dy + w * (init.start_derivative + init.end_derivative)) / w3;
        Self {
            coeff: [init.start_y, init.start_derivative, c2, c3],
        }
    }

    #[inline]
    pub fn from_coeff(coeff: [f32; 4]) -> Self {
        Self { coeff }
    }

    #[inline]
    pub fn coeff(&self) -> [f32; 4] {
        self.coeff
    }

    #[inline]
    pub fn evaluate(&self, x: f32) -> f32 {
        let [c0, c1, c2, c3] = self.coeff;
        c0 + x * (c1 + x * (c2 + x * c3))
    }

    #[inline]
    pub fn derivative(&self, x: f32) -> f32 {
        let [_, c1, c2, c3] = self.coeff;
        c1 + x * (2.0 * c2 + x * 3.0 * c3)
    }

    #[inline]
    pub fn second_derivative(&self, x: f32) -> f32 {
        let [_, _, c2, c3] = self.coeff;
        2.0 * c2 + 6.0 * c3 * x
    }

    #[inline]
    pub fn third_derivative(&self) -> f32 {
        6.0 * self.coeff[3]
    }

    /// Re-express the curve so that the new `x = 0` is the old `x = delta`.
    pub fn shift_left(&mut self, delta: f32) {
        let c3 = self.coeff[3];
        self.coeff = [
            self.evaluate(delta),
            self.derivative(delta),
            0.5 * self.second_derivative(delta),
            c3,
        ];
    }

    /// Re-express the curve so that the new `x = 0` is the old `x = -delta`.
    #[inline]
    pub fn shift_right(&mut self, delta: f32) {
        self.shift_left(-delta);
    }

    /// Translate the curve vertically.
    #[inline]
    pub fn shift_up(&mut self, delta: f32) {
        self.coeff[0] += delta;
    }
}

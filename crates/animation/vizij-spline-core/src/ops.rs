//! Matrix operation kinds and their initializers.
//!
//! Each animated channel drives one scalar operation of a bone's transform
//! (rotate about an axis, translate along an axis, scale). The operation kind
//! selects the fitting tolerance, the neutral value, and whether the value is
//! modular.

use serde::{Deserialize, Serialize};

use crate::compact_spline::CompactSpline;
use crate::config::Tolerances;
use crate::ids::MatrixOpId;
use crate::range::{Range, ANGLE_RANGE};

/// Scalar operation applied to a bone transform.
///
/// Discriminants are consecutive within each family (X, Y, Z) so that an axis
/// offset can be added to the family's first operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MatrixOperationType {
    RotateAboutX = 1,
    RotateAboutY = 2,
    RotateAboutZ = 3,
    TranslateX = 4,
    TranslateY = 5,
    TranslateZ = 6,
    ScaleX = 7,
    ScaleY = 8,
    ScaleZ = 9,
    ScaleUniformly = 10,
}

const AXIS_OPS: [MatrixOperationType; 10] = [
    MatrixOperationType::RotateAboutX,
    MatrixOperationType::RotateAboutY,
    MatrixOperationType::RotateAboutZ,
    MatrixOperationType::TranslateX,
    MatrixOperationType::TranslateY,
    MatrixOperationType::TranslateZ,
    MatrixOperationType::ScaleX,
    MatrixOperationType::ScaleY,
    MatrixOperationType::ScaleZ,
    MatrixOperationType::ScaleUniformly,
];

impl MatrixOperationType {
    #[inline]
    pub fn is_rotate(self) -> bool {
        matches!(
            self,
            Self::RotateAboutX | Self::RotateAboutY | Self::RotateAboutZ
        )
    }

    #[inline]
    pub fn is_translate(self) -> bool {
        matches!(self, Self::TranslateX | Self::TranslateY | Self::TranslateZ)
    }

    #[inline]
    pub fn is_scale(self) -> bool {
        matches!(
            self,
            Self::ScaleX | Self::ScaleY | Self::ScaleZ | Self::ScaleUniformly
        )
    }

    /// Value that leaves the transform unchanged. A channel that is constantly at
    /// this value can be dropped.
    #[inline]
    pub fn default_value(self) -> f32 {
        if self.is_scale() {
            1.0
        } else {
            0.0
        }
    }

    /// Modular range of the operation's value: `(-pi, pi]` for rotations,
    /// invalid (no normalization) otherwise.
    #[inline]
    pub fn range(self) -> Range {
        if self.is_rotate() {
            ANGLE_RANGE
        } else {
            Range::empty()
        }
    }

    /// Reconstruction tolerance for channels of this kind.
    #[inline]
    pub fn tolerance(self, tolerances: &Tolerances) -> f32 {
        if self.is_rotate() {
            tolerances.rotate
        } else if self.is_translate() {
            tolerances.translate
        } else {
            tolerances.scale
        }
    }

    /// Operation `axis` steps after `self` in the same family, e.g.
    /// `RotateAboutX.with_axis(2) == RotateAboutZ`.
    pub fn with_axis(self, axis: usize) -> Self {
        let idx = (self as usize - 1) + axis;
        debug_assert!(idx < AXIS_OPS.len(), "axis {axis} overflows {self:?}");
        AXIS_OPS[idx.min(AXIS_OPS.len() - 1)]
    }

    /// Bit for this operation, for order-insensitive set tests.
    #[inline]
    pub(crate) fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RotateAboutX => "rotate about x",
            Self::RotateAboutY => "rotate about y",
            Self::RotateAboutZ => "rotate about z",
            Self::TranslateX => "translate x",
            Self::TranslateY => "translate y",
            Self::TranslateZ => "translate z",
            Self::ScaleX => "scale x",
            Self::ScaleY => "scale y",
            Self::ScaleZ => "scale z",
            Self::ScaleUniformly => "scale uniformly",
        }
    }
}

/// Euler rotation order of a source bone.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationOrder {
    #[default]
    Xyz,
    Xzy,
    Yzx,
    Yxz,
    Zxy,
    Zyx,
    SphericXyz,
}

pub const DEFAULT_CHANNEL_ORDER: [usize; 3] = [0, 1, 2];

/// Axis emitted first, second and third for each rotation order. Operations are
/// applied in reverse, so the last rotation comes first.
pub const ROTATION_ORDER_TO_CHANNEL_ORDER: [[usize; 3]; 7] = [
    [2, 1, 0], // Xyz
    [2, 0, 1], // Xzy
    [1, 0, 2], // Yzx
    [1, 2, 0], // Yxz
    [0, 2, 1], // Zxy
    [0, 1, 2], // Zyx
    [2, 1, 0], // SphericXyz
];

/// Same as `ROTATION_ORDER_TO_CHANNEL_ORDER`, for inverted rotations.
pub const ROTATION_ORDER_TO_CHANNEL_ORDER_INVERTED: [[usize; 3]; 7] = [
    [0, 1, 2], // Xyz
    [0, 2, 1], // Xzy
    [1, 2, 0], // Yzx
    [1, 0, 2], // Yxz
    [2, 0, 1], // Zxy
    [2, 1, 0], // Zyx
    [0, 1, 2], // SphericXyz
];

impl RotationOrder {
    /// Order in which the x, y, z channels of `op` should be emitted. Only
    /// rotations depend on the rotation order.
    pub fn channel_order(self, op: MatrixOperationType, invert: bool) -> [usize; 3] {
        if !op.is_rotate() {
            return DEFAULT_CHANNEL_ORDER;
        }
        let table = if invert {
            &ROTATION_ORDER_TO_CHANNEL_ORDER_INVERTED
        } else {
            &ROTATION_ORDER_TO_CHANNEL_ORDER
        };
        table[self as usize]
    }
}

/// How a matrix operation gets its value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OperationValue<'a> {
    /// Driven externally; no initial value.
    Empty,
    /// Constant (or starting) value.
    InitialValue(f32),
    /// Follows a packed spline owned elsewhere.
    Spline(&'a CompactSpline),
}

/// Initialization of one operation in a bone's matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatrixOperationInit<'a> {
    pub id: MatrixOpId,
    pub op: MatrixOperationType,
    pub value: OperationValue<'a>,
}

impl<'a> MatrixOperationInit<'a> {
    pub fn constant(id: MatrixOpId, op: MatrixOperationType, value: f32) -> Self {
        Self {
            id,
            op,
            value: OperationValue::InitialValue(value),
        }
    }

    pub fn spline(id: MatrixOpId, op: MatrixOperationType, spline: &'a CompactSpline) -> Self {
        Self {
            id,
            op,
            value: OperationValue::Spline(spline),
        }
    }

    pub fn initial_value(&self) -> Option<f32> {
        match self.value {
            OperationValue::InitialValue(v) => Some(v),
            _ => None,
        }
    }

    pub fn spline_ref(&self) -> Option<&'a CompactSpline> {
        match self.value {
            OperationValue::Spline(s) => Some(s),
            _ => None,
        }
    }
}

/// Ordered list of operations that together build one bone's matrix.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatrixOpArray<'a> {
    ops: Vec<MatrixOperationInit<'a>>,
}

impl<'a> MatrixOpArray<'a> {
    /// Guess at the number of operations per bone; reallocating costs more than
    /// a few spare slots.
    pub const DEFAULT_EXPECTED_NUM_OPS: usize = 8;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_EXPECTED_NUM_OPS)
    }

    pub fn with_capacity(expected_num_ops: usize) -> Self {
        Self {
            ops: Vec::with_capacity(expected_num_ops),
        }
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn push(&mut self, op: MatrixOperationInit<'a>) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[MatrixOperationInit<'a>] {
        &self.ops
    }

    /// Maximum end time of any spline-driven operation.
    pub fn end_time(&self) -> f32 {
        self.ops
            .iter()
            .filter_map(|op| op.spline_ref())
            .map(|s| s.end_x())
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_and_defaults() {
        use MatrixOperationType::*;
        assert!(RotateAboutY.is_rotate() && !RotateAboutY.is_scale());
        assert!(TranslateZ.is_translate());
        assert!(ScaleUniformly.is_scale());
        assert_eq!(ScaleX.default_value(), 1.0);
        assert_eq!(TranslateX.default_value(), 0.0);
        assert!(RotateAboutZ.range().valid());
        assert!(!TranslateX.range().valid());
    }

    #[test]
    fn with_axis_walks_the_family() {
        use MatrixOperationType::*;
        assert_eq!(RotateAboutX.with_axis(2), RotateAboutZ);
        assert_eq!(TranslateX.with_axis(1), TranslateY);
        assert_eq!(ScaleX.with_axis(0), ScaleX);
    }

    #[test]
    fn only_rotations_use_the_rotation_order() {
        use MatrixOperationType::*;
        assert_eq!(RotationOrder::Xyz.channel_order(RotateAboutX, false), [2, 1, 0]);
        assert_eq!(RotationOrder::Xyz.channel_order(RotateAboutX, true), [0, 1, 2]);
        assert_eq!(RotationOrder::Zxy.channel_order(TranslateX, false), [0, 1, 2]);
    }
}

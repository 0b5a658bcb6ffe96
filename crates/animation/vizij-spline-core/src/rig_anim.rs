//! Finished rig animation: per-bone matrix operations, each constant or packed
//! into a `CompactSpline`.

use std::mem::size_of;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::compact_spline::{AddMode, CompactSpline};
use crate::error::SplineError;
use crate::fit::Channel;
use crate::ids::{BoneIndex, MatrixOpId, Tick};
use crate::ops::{MatrixOpArray, MatrixOperationInit, MatrixOperationType};
use crate::range::Range;
use crate::Result;

/// Packed size of one spline node.
pub const BYTES_PER_SPLINE_NODE: usize = 6;

/// Value of one matrix operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OpValue {
    Constant(f32),
    Spline(CompactSpline),
}

/// One operation of a bone's matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatrixOpAnim {
    pub id: MatrixOpId,
    pub op: MatrixOperationType,
    pub value: OpValue,
}

impl MatrixOpAnim {
    /// Constant for single-node channels, packed spline otherwise.
    pub fn from_channel(bone_name: &str, channel: &Channel) -> Result<Self> {
        let value = match channel.nodes.as_slice() {
            [] => {
                return Err(SplineError::InsufficientSamples {
                    required: 1,
                    actual: 0,
                })
            }
            [only] => OpValue::Constant(only.val),
            [first, ..] => {
                if first.time < 0 {
                    warn!(
                        "{} ({}) starts at negative time {}",
                        bone_name,
                        channel.op.name(),
                        first.time
                    );
                }
                OpValue::Spline(create_compact_spline(channel)?)
            }
        };
        Ok(Self {
            id: channel.id,
            op: channel.op,
            value,
        })
    }

    pub fn init(&self) -> MatrixOperationInit<'_> {
        match &self.value {
            OpValue::Constant(v) => MatrixOperationInit::constant(self.id, self.op, *v),
            OpValue::Spline(s) => MatrixOperationInit::spline(self.id, self.op, s),
        }
    }
}

/// Operations of one bone, applied in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneAnim {
    pub name: String,
    pub parent: Option<BoneIndex>,
    pub ops: Vec<MatrixOpAnim>,
}

/// A complete animation for a rig.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigAnim {
    pub name: String,
    pub bones: Vec<BoneAnim>,
    /// Loop back to the start after reaching the end.
    pub repeat: bool,
    pub start_time: Tick,
    pub end_time: Tick,
}

impl RigAnim {
    #[inline]
    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    /// Initializers for the operations of `bone`.
    pub fn op_array(&self, bone: BoneIndex) -> Result<MatrixOpArray<'_>> {
        let b = self.bones.get(bone.index()).ok_or(SplineError::BoneOutOfRange {
            bone: bone.index(),
            len: self.bones.len(),
        })?;
        let mut ops = MatrixOpArray::with_capacity(b.ops.len());
        for op in &b.ops {
            ops.push(op.init());
        }
        Ok(ops)
    }

    /// Approximate in-memory size of the packed animation.
    pub fn estimated_bytes(&self) -> usize {
        let mut bytes = size_of::<RigAnim>() + self.bones.len() * size_of::<BoneAnim>();
        for bone in &self.bones {
            bytes += bone.ops.len() * size_of::<MatrixOpAnim>();
            for op in &bone.ops {
                if let OpValue::Spline(s) = &op.value {
                    bytes += size_of::<CompactSpline>() + s.num_nodes() * BYTES_PER_SPLINE_NODE;
                }
            }
        }
        bytes
    }

    /// One single-bone animation per bone that has operations, named
    /// `<name>_<bone index>`. The split bones have no parent.
    pub fn split_by_bone(&self) -> Vec<RigAnim> {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.ops.is_empty())
            .map(|(idx, b)| RigAnim {
                name: format!("{}_{}", self.name, idx),
                bones: vec![BoneAnim {
                    name: b.name.clone(),
                    parent: None,
                    ops: b.ops.clone(),
                }],
                repeat: self.repeat,
                start_time: self.start_time,
                end_time: self.end_time,
            })
            .collect()
    }
}

/// Pack a channel of two or more nodes.
///
/// The y range is the extent of the node values and the x granularity spreads
/// the last node time over the full x resolution. Negative times clamp to 0.
pub fn create_compact_spline(channel: &Channel) -> Result<CompactSpline> {
    let nodes = &channel.nodes;
    let Some(last) = nodes.last().filter(|_| nodes.len() > 1) else {
        return Err(SplineError::InsufficientSamples {
            required: 2,
            actual: nodes.len(),
        });
    };

    let y_range = nodes
        .iter()
        .fold(Range::empty(), |range, n| range.include(n.val));
    let x_granularity = CompactSpline::recommend_x_granularity(last.time as f32);

    let mut spline = CompactSpline::with_capacity(nodes.len());
    spline.init(y_range, x_granularity);
    for n in nodes {
        let x = n.time.max(0) as f32;
        spline.add_node(x, n.val, n.derivative, AddMode::Reject)?;
    }
    Ok(spline)
}

/// Serialize a rig animation as pretty JSON.
pub fn export_rig_anim_json(anim: &RigAnim) -> Result<String> {
    Ok(serde_json::to_string_pretty(anim)?)
}

/// Parse a rig animation previously written by `export_rig_anim_json`.
pub fn parse_rig_anim_json(json: &str) -> Result<RigAnim> {
    Ok(serde_json::from_str(json)?)
}

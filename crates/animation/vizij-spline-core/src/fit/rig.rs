//! Rig-level fitting driver: bones, their channels, and the passes that turn
//! them into a finished `RigAnim`.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{FitConfig, RepeatPreference, Tolerances};
use crate::error::SplineError;
use crate::ids::{BoneIndex, MatrixOpId, Tick};
use crate::ops::MatrixOperationType;
use crate::rig_anim::{BoneAnim, MatrixOpAnim, RigAnim};
use crate::Result;

use super::curve::{derivative_angle, fit_samples, Channel, Samples, SplineNode};
use super::gather::{constant_value, first_curve, gather_curve, AnimOp, ChannelSource};
use super::simplify::{is_default_value, prune_channels, prune_nodes};

/// Text after the last `:`; importers namespace bone names with colons.
pub fn bone_base_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(colon) => &name[colon + 1..],
        None => name,
    }
}

/// A bone being fitted. Parents always precede their children in the arena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    pub parent: Option<BoneIndex>,
    pub channels: Vec<Channel>,
}

impl Bone {
    #[inline]
    pub fn base_name(&self) -> &str {
        bone_base_name(&self.name)
    }
}

/// Collects per-bone channels, fits them, and finishes them into a `RigAnim`.
#[derive(Clone, Debug, Default)]
pub struct RigBuilder {
    config: FitConfig,
    bones: Vec<Bone>,
}

impl RigBuilder {
    pub fn new(config: FitConfig) -> Self {
        Self {
            config,
            bones: Vec::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    #[inline]
    pub fn tolerances(&self) -> &Tolerances {
        &self.config.tolerances
    }

    #[inline]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    /// Append a bone. `parent` must be an existing bone.
    pub fn alloc_bone(
        &mut self,
        name: impl Into<String>,
        parent: Option<BoneIndex>,
    ) -> Result<BoneIndex> {
        let index = self.bones.len();
        if let Some(parent) = parent {
            if parent.index() >= index {
                return Err(SplineError::InvalidParent {
                    bone: index,
                    parent: parent.index(),
                });
            }
        }
        if index > usize::from(u16::MAX) {
            return Err(SplineError::BoneOutOfRange {
                bone: index,
                len: index,
            });
        }
        self.bones.push(Bone {
            name: name.into(),
            parent,
            channels: Vec::new(),
        });
        Ok(BoneIndex::from(index))
    }

    pub fn bone(&self, bone: BoneIndex) -> Result<&Bone> {
        let len = self.bones.len();
        self.bones
            .get(bone.index())
            .ok_or(SplineError::BoneOutOfRange {
                bone: bone.index(),
                len,
            })
    }

    fn bone_mut(&mut self, bone: BoneIndex) -> Result<&mut Bone> {
        let len = self.bones.len();
        self.bones
            .get_mut(bone.index())
            .ok_or(SplineError::BoneOutOfRange {
                bone: bone.index(),
                len,
            })
    }

    pub fn channel(&self, bone: BoneIndex, channel: usize) -> Result<&Channel> {
        let channels = &self.bone(bone)?.channels;
        channels.get(channel).ok_or(SplineError::ChannelOutOfRange {
            channel,
            len: channels.len(),
        })
    }

    fn channel_mut(&mut self, bone: BoneIndex, channel: usize) -> Result<&mut Channel> {
        let channels = &mut self.bone_mut(bone)?.channels;
        let len = channels.len();
        channels
            .get_mut(channel)
            .ok_or(SplineError::ChannelOutOfRange { channel, len })
    }

    /// Add an empty channel to `bone` and return its index.
    pub fn alloc_channel(
        &mut self,
        bone: BoneIndex,
        op: MatrixOperationType,
        id: MatrixOpId,
    ) -> Result<usize> {
        let channels = &mut self.bone_mut(bone)?.channels;
        channels.push(Channel::new(op, id));
        Ok(channels.len() - 1)
    }

    pub fn num_nodes(&self, bone: BoneIndex, channel: usize) -> Result<usize> {
        Ok(self.channel(bone, channel)?.nodes.len())
    }

    /// Make the channel constant.
    pub fn add_constant(&mut self, bone: BoneIndex, channel: usize, value: f32) -> Result<()> {
        self.channel_mut(bone, channel)?.set_constant(value);
        Ok(())
    }

    /// Fit dense samples onto the end of the channel.
    pub fn add_curve(
        &mut self,
        bone: BoneIndex,
        channel: usize,
        times: &[Tick],
        values: &[f32],
        derivatives: &[f32],
    ) -> Result<()> {
        let samples = Samples::new(times, values, derivatives)?;
        let tolerances = self.config.tolerances;
        let ch = self.channel_mut(bone, channel)?;
        let tolerance = ch.tolerance(&tolerances);
        fit_samples(&samples, tolerance, &mut ch.nodes);
        Ok(())
    }

    /// Remove redundant nodes from the channel.
    pub fn prune_nodes(&mut self, bone: BoneIndex, channel: usize) -> Result<()> {
        let tolerances = self.config.tolerances;
        let ch = self.channel_mut(bone, channel)?;
        let tolerance = ch.tolerance(&tolerances);
        prune_nodes(&mut ch.nodes, tolerance, tolerances.derivative_angle);
        Ok(())
    }

    /// Collapse, merge and drop the bone's channels where possible.
    pub fn prune_channels(&mut self, bone: BoneIndex) -> Result<()> {
        let tolerances = self.config.tolerances;
        prune_channels(&mut self.bone_mut(bone)?.channels, &tolerances);
        Ok(())
    }

    /// Add one channel from an importer source.
    ///
    /// Constant sources at the operation's neutral value are skipped and return
    /// `None`. Keyed curves that never move become constant channels.
    pub fn gather_channel(
        &mut self,
        bone: BoneIndex,
        id: MatrixOpId,
        op: AnimOp,
        source: &ChannelSource<'_>,
    ) -> Result<Option<usize>> {
        let tolerance = op.op.tolerance(self.tolerances());
        let derivative_angle_tolerance = self.tolerances().derivative_angle;
        let samples_per_key_interval = self.config.samples_per_key_interval;

        let curve = match source {
            ChannelSource::Constant(_) => None,
            ChannelSource::Curves(curves) => match first_curve(curves, op.op) {
                Some(curve) => Some(curve),
                None => return Ok(None),
            },
        };
        let constant = match (source, curve) {
            (ChannelSource::Constant(v), _) => Some(op.apply_value(*v)),
            (_, Some(curve)) => {
                constant_value(curve, op, tolerance, derivative_angle_tolerance)
            }
            (_, None) => None,
        };

        if let Some(value) = constant {
            if is_default_value(op.op, value, self.tolerances()) {
                return Ok(None);
            }
            let channel = self.alloc_channel(bone, op.op, id)?;
            self.add_constant(bone, channel, value)?;
            debug!(
                "[channel {}] {}: constant {}",
                channel,
                op.op.name(),
                value
            );
            return Ok(Some(channel));
        }

        let Some(curve) = curve else {
            return Ok(None);
        };
        let channel = self.alloc_channel(bone, op.op, id)?;
        debug!("[channel {}] {}: curve", channel, op.op.name());
        let ch = self.channel_mut(bone, channel)?;
        gather_curve(
            curve,
            op,
            samples_per_key_interval,
            tolerance,
            derivative_angle_tolerance,
            &mut ch.nodes,
        )?;
        self.log_channel(bone, channel);
        Ok(Some(channel))
    }

    /// Whether an importer walking the hierarchy should visit the bone's children.
    pub fn should_recurse(&self, bone: BoneIndex) -> bool {
        !self.config.root_bones_only
            || self
                .bones
                .get(bone.index())
                .map_or(true, |b| b.channels.is_empty())
    }

    fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.bones.iter().flat_map(|b| b.channels.iter())
    }

    /// Shift every node of every channel by `offset` ticks.
    pub fn shift_time(&mut self, offset: Tick) {
        if offset == 0 {
            return;
        }
        info!("shifting animation by {} ticks", offset);
        for node in self
            .bones
            .iter_mut()
            .flat_map(|b| b.channels.iter_mut())
            .flat_map(|c| c.nodes.iter_mut())
        {
            node.time += offset;
        }
    }

    /// Hold every animated channel that ends before `end_time` flat until `end_time`.
    pub fn extend_channels_to_time(&mut self, end_time: Tick) {
        for ch in self.bones.iter_mut().flat_map(|b| b.channels.iter_mut()) {
            if ch.nodes.len() <= 1 {
                continue;
            }
            let Some(&back) = ch.nodes.last() else {
                continue;
            };
            if back.time >= end_time {
                continue;
            }
            if back.derivative != 0.0 {
                ch.nodes.push(SplineNode::new(back.time, back.val, 0.0));
            }
            ch.nodes.push(SplineNode::new(end_time, back.val, 0.0));
        }
    }

    /// Earliest start of any animated channel, or 0 if none. May be negative.
    pub fn min_animated_time(&self) -> Tick {
        self.channels()
            .filter(|c| c.nodes.len() > 1)
            .filter_map(Channel::start_time)
            .min()
            .unwrap_or(0)
    }

    /// Latest end of any animated channel, or 0 if none.
    pub fn max_animated_time(&self) -> Tick {
        self.channels()
            .filter(|c| c.nodes.len() > 1)
            .filter_map(Channel::end_time)
            .max()
            .unwrap_or(0)
    }

    /// First channel whose end does not match its start within tolerance, as
    /// `(bone, channel index)`.
    pub fn first_non_repeating_channel(&self) -> Option<(BoneIndex, usize)> {
        let tolerances = self.tolerances();
        for (bone_idx, bone) in self.bones.iter().enumerate() {
            for (channel_idx, ch) in bone.channels.iter().enumerate() {
                let (Some(start), Some(end)) = (ch.nodes.first(), ch.nodes.last()) else {
                    continue;
                };
                let diff_val = (start.val - end.val).abs();
                let diff_angle =
                    (derivative_angle(start.derivative) - derivative_angle(end.derivative)).abs();
                let same = diff_val < ch.tolerance(tolerances)
                    && diff_angle < tolerances.repeat_derivative_angle;
                if !same {
                    return Some((BoneIndex::from(bone_idx), channel_idx));
                }
            }
        }
        None
    }

    /// Whether playback should loop, given the caller's preference.
    pub fn should_repeat(&self, preference: RepeatPreference) -> bool {
        match preference {
            RepeatPreference::Never => false,
            RepeatPreference::Always => {
                if let Some((bone, channel)) = self.first_non_repeating_channel() {
                    let b = &self.bones[bone.index()];
                    warn!(
                        "animation marked as repeating (as requested), but it does not repeat on bone {}'s `{}` channel",
                        b.base_name(),
                        b.channels[channel].op.name()
                    );
                }
                true
            }
            RepeatPreference::IfRepeatable => {
                let repeat = self.first_non_repeating_channel().is_none();
                debug!(
                    "{}",
                    if repeat {
                        "animation repeats"
                    } else {
                        "animation does not repeat"
                    }
                );
                repeat
            }
        }
    }

    /// Dump the nodes of one channel at debug level.
    pub fn log_channel(&self, bone: BoneIndex, channel: usize) {
        let Ok(ch) = self.channel(bone, channel) else {
            return;
        };
        for (i, n) in ch.nodes.iter().enumerate() {
            debug!("    flat, {}, {}, {}, {}", i, n.time, n.val, n.derivative);
        }
    }

    /// One summary line per channel at info level.
    pub fn log_all_channels(&self) {
        info!(
            "  {:>30} {:>16}  {:>9}   values",
            "bone name", "operation", "time range"
        );
        for bone in &self.bones {
            for ch in &bone.channels {
                let range = match (ch.nodes.first(), ch.nodes.last()) {
                    (Some(first), Some(last)) if ch.nodes.len() > 1 => {
                        format!("{:4}~{:4}", first.time, last.time)
                    }
                    _ => " constant".to_string(),
                };
                let values = ch
                    .nodes
                    .iter()
                    .map(|n| {
                        if ch.op.is_rotate() {
                            format!("{:.0}", n.val.to_degrees())
                        } else if ch.op.is_translate() {
                            format!("{:.1}", n.val)
                        } else {
                            format!("{:.2}", n.val)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                info!(
                    "  {:>30} {:>16}   {}   {}",
                    bone.base_name(),
                    ch.op.name(),
                    range,
                    values
                );
            }
        }
    }

    /// Simplify every bone's channels, normalize time, extend channels and pack
    /// everything into a `RigAnim`.
    ///
    /// Unless the config says otherwise the earliest animated time becomes tick
    /// 0 and every animated channel is held to the latest end time.
    pub fn finish(mut self, name: impl Into<String>) -> Result<RigAnim> {
        let tolerances = self.config.tolerances;
        for bone in &mut self.bones {
            prune_channels(&mut bone.channels, &tolerances);
        }
        if !self.config.preserve_start_time {
            let min = self.min_animated_time();
            self.shift_time(-min);
        }
        if !self.config.stagger_end_times {
            let max = self.max_animated_time();
            self.extend_channels_to_time(max);
        }
        self.log_all_channels();

        let repeat = self.should_repeat(self.config.repeat_preference);
        let start_time = self.min_animated_time();
        let end_time = self.max_animated_time();

        let mut bones = Vec::with_capacity(self.bones.len());
        for bone in &self.bones {
            let mut ops = Vec::with_capacity(bone.channels.len());
            for ch in &bone.channels {
                if ch.nodes.is_empty() {
                    warn!(
                        "{} ({}) has no data; skipping",
                        bone.base_name(),
                        ch.op.name()
                    );
                    continue;
                }
                ops.push(MatrixOpAnim::from_channel(bone.base_name(), ch)?);
            }
            bones.push(BoneAnim {
                name: bone.base_name().to_string(),
                parent: bone.parent,
                ops,
            });
        }
        if bones.iter().all(|b| b.ops.is_empty()) {
            warn!("no animation found");
        }

        let rig = RigAnim {
            name: name.into(),
            bones,
            repeat,
            start_time,
            end_time,
        };
        info!("  {} ({} bytes)", rig.name, rig.estimated_bytes());
        Ok(rig)
    }

    /// `finish`, then one `RigAnim` per animated bone when `root_bones_only` is set.
    pub fn finish_all(self, name: impl Into<String>) -> Result<Vec<RigAnim>> {
        let root_bones_only = self.config.root_bones_only;
        let rig = self.finish(name)?;
        if !root_bones_only {
            return Ok(vec![rig]);
        }
        Ok(rig.split_by_bone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_namespaces() {
        assert_eq!(bone_base_name("rig:arm:elbow"), "elbow");
        assert_eq!(bone_base_name("root"), "root");
        assert_eq!(bone_base_name("ns:"), "");
    }

    #[test]
    fn parents_must_precede_children() {
        let mut rig = RigBuilder::default();
        let root = rig.alloc_bone("root", None).unwrap();
        assert!(rig.alloc_bone("child", Some(root)).is_ok());
        let err = rig.alloc_bone("orphan", Some(BoneIndex(5))).unwrap_err();
        assert_eq!(err, SplineError::InvalidParent { bone: 2, parent: 5 });
    }
}

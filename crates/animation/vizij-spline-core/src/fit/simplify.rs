//! Node pruning and channel-level simplification.

use log::debug;

use crate::config::Tolerances;
use crate::cubic::{CubicCurve, CubicInit};
use crate::ids::Tick;
use crate::ops::MatrixOperationType;

use super::curve::{derivative_angle, Channel, SplineNode};

/// Nodes at the same time whose values and slope angles match within tolerance.
pub fn equal_nodes(
    a: &SplineNode,
    b: &SplineNode,
    tolerance: f32,
    derivative_angle_tolerance: f32,
) -> bool {
    a.time == b.time
        && (a.val - b.val).abs() < tolerance
        && (derivative_angle(a.derivative) - derivative_angle(b.derivative)).abs()
            < derivative_angle_tolerance
}

/// True if every node strictly between the first and last of `nodes` lies on
/// the cubic built from the first and last alone.
pub fn intermediate_nodes_redundant(
    nodes: &[SplineNode],
    tolerance: f32,
    derivative_angle_tolerance: f32,
) -> bool {
    let (Some(start), Some(end)) = (nodes.first(), nodes.last()) else {
        return true;
    };
    if equal_nodes(start, end, tolerance, derivative_angle_tolerance) {
        return true;
    }

    let cubic = CubicCurve::new(&CubicInit::new(
        start.val,
        start.derivative,
        end.val,
        end.derivative,
        (end.time - start.time) as f32,
    ));
    nodes[1..nodes.len() - 1].iter().all(|mid| {
        let x = (mid.time - start.time) as f32;
        let angle_error =
            derivative_angle(cubic.derivative(x)) - derivative_angle(mid.derivative);
        (cubic.evaluate(x) - mid.val).abs() < tolerance
            && angle_error.abs() < derivative_angle_tolerance
    })
}

/// Remove nodes that the curve does not need, then collapse a flat two-node
/// channel to a single constant node.
///
/// From each anchor the deletable span is extended one node at a time until a
/// span is no longer redundant; the last redundant span's end becomes the next
/// anchor. Passes repeat until nothing changes, so pruning an already pruned
/// list is a no-op.
pub fn prune_nodes(nodes: &mut Vec<SplineNode>, tolerance: f32, derivative_angle_tolerance: f32) {
    loop {
        let before = nodes.len();
        prune_pass(nodes, tolerance, derivative_angle_tolerance);
        if nodes.len() == before {
            break;
        }
    }

    let flat = |n: &SplineNode| derivative_angle(n.derivative).abs() < derivative_angle_tolerance;
    if let [a, b] = nodes.as_slice() {
        if (a.val - b.val).abs() < tolerance && flat(a) && flat(b) {
            nodes.truncate(1);
        }
    }
}

fn prune_pass(nodes: &mut Vec<SplineNode>, tolerance: f32, derivative_angle_tolerance: f32) {
    let mut kept = Vec::with_capacity(nodes.len());
    let mut anchor = 0;
    while anchor < nodes.len() {
        kept.push(nodes[anchor]);
        let mut next = anchor + 1;
        let mut end = anchor + 2;
        while end < nodes.len()
            && intermediate_nodes_redundant(
                &nodes[anchor..=end],
                tolerance,
                derivative_angle_tolerance,
            )
        {
            next = end;
            end += 1;
        }
        anchor = next;
    }
    *nodes = kept;
}

/// Value and slope of a node list at `time`.
///
/// Before the first node the first value is held, after the last node the last
/// value is held; the slope is 0 in both cases. At the last node's time the
/// node's own slope is reported.
pub fn evaluate_nodes(nodes: &[SplineNode], time: Tick) -> (f32, f32) {
    let (Some(first), Some(last)) = (nodes.first(), nodes.last()) else {
        return (0.0, 0.0);
    };
    if time < first.time {
        return (first.val, 0.0);
    }
    if time > last.time {
        return (last.val, 0.0);
    }
    if time == last.time {
        return (last.val, last.derivative);
    }

    let i = nodes.partition_point(|n| n.time < time).max(1);
    let pre = &nodes[i - 1];
    let post = &nodes[i];
    let cubic = CubicCurve::new(&CubicInit::new(
        pre.val,
        pre.derivative,
        post.val,
        post.derivative,
        (post.time - pre.time) as f32,
    ));
    let x = (time - pre.time) as f32;
    (cubic.evaluate(x), cubic.derivative(x))
}

/// Merge two additive node lists into one whose value is their sum.
///
/// Every distinct time in either list gets one node: that list's own node plus
/// the other list's interpolated value and slope. A constant (single node)
/// list contributes its value to the other list's nodes but no nodes of its own.
pub fn sum_nodes(a: &[SplineNode], b: &[SplineNode]) -> Vec<SplineNode> {
    let mut ia = if a.len() == 1 { a.len() } else { 0 };
    let mut ib = if b.len() == 1 && ia == 0 { b.len() } else { 0 };
    let mut sum = Vec::with_capacity(a.len() + b.len());

    while ia < a.len() || ib < b.len() {
        let output_a = ia < a.len() && (ib >= b.len() || a[ia].time <= b[ib].time);
        let (node, other) = if output_a { (&a[ia], b) } else { (&b[ib], a) };
        let (val, derivative) = evaluate_nodes(other, node.time);
        sum.push(SplineNode::new(
            node.time,
            node.val + val,
            node.derivative + derivative,
        ));

        if ia < a.len() && ib < b.len() && a[ia].time == b[ib].time {
            ia += 1;
            ib += 1;
        } else if output_a {
            ia += 1;
        } else {
            ib += 1;
        }
    }
    sum
}

/// True if the three channels starting at `ch` are scale X, Y and Z (in any
/// order) with matching node lists.
pub fn uniform_scale_channels(channels: &[Channel], ch: usize, tolerances: &Tolerances) -> bool {
    let Some([c0, c1, c2]) = channels.get(ch..ch + 3) else {
        return false;
    };

    let bits = c0.op.bit() | c1.op.bit() | c2.op.bit();
    let xyz = MatrixOperationType::ScaleX.bit()
        | MatrixOperationType::ScaleY.bit()
        | MatrixOperationType::ScaleZ.bit();
    if bits != xyz {
        return false;
    }

    let (n0, n1, n2) = (&c0.nodes, &c1.nodes, &c2.nodes);
    if n0.len() != n1.len() || n0.len() != n2.len() {
        return false;
    }

    let tol = tolerances.scale;
    let dtol = tolerances.derivative_angle;
    n0.iter().zip(n1).zip(n2).all(|((v0, v1), v2)| {
        equal_nodes(v0, v1, tol, dtol)
            && equal_nodes(v0, v2, tol, dtol)
            && equal_nodes(v1, v2, tol, dtol)
    })
}

/// Index of a later channel that can be summed into channel `ch`.
///
/// Same-kind channels sum when only commuting operations sit between them:
/// translations across translations, scales across scales. Rotations must be
/// adjacent.
pub fn summable_channel(channels: &[Channel], ch: usize) -> Option<usize> {
    let ch_op = channels.get(ch)?.op;
    for (id, channel) in channels.iter().enumerate().skip(ch + 1) {
        let id_op = channel.op;
        if id_op == ch_op {
            return Some(id);
        }
        if ch_op.is_rotate()
            || (ch_op.is_translate() && !id_op.is_translate())
            || (ch_op.is_scale() && !id_op.is_scale())
        {
            return None;
        }
    }
    None
}

/// Sum channel `b` into channel `a`. Channel `b` is left untouched.
pub fn sum_channels(channels: &mut [Channel], a: usize, b: usize) {
    let summed = sum_nodes(&channels[a].nodes, &channels[b].nodes);
    channels[a].nodes = summed;
}

/// True if `value` is within the operation's tolerance of its neutral value.
pub fn is_default_value(op: MatrixOperationType, value: f32, tolerances: &Tolerances) -> bool {
    (value - op.default_value()).abs() < op.tolerance(tolerances)
}

/// Collapse, merge and drop channels of one bone.
///
/// Walks from the last channel to the first: scale X/Y/Z triples become one
/// uniform scale, summable pairs merge, and constants at the neutral value are
/// dropped. Channels end sorted by id.
pub fn prune_channels(channels: &mut Vec<Channel>, tolerances: &Tolerances) {
    // Removals only touch indices >= ch, so walking down stays in bounds.
    for ch in (0..channels.len()).rev() {
        if uniform_scale_channels(channels, ch, tolerances) {
            debug!(
                "collapsing scale channels {}~{} into one uniform scale channel",
                ch,
                ch + 2
            );
            let offset = MatrixOperationType::ScaleUniformly as i32 - channels[ch].op as i32;
            channels[ch].id = channels[ch].id.offset(offset);
            channels[ch].op = MatrixOperationType::ScaleUniformly;
            channels.drain(ch + 1..ch + 3);
        }

        if let Some(other) = summable_channel(channels, ch) {
            debug!(
                "summing {} channels {} and {}",
                channels[ch].op.name(),
                ch,
                other
            );
            sum_channels(channels, ch, other);
            channels.remove(other);
        }

        let elide = matches!(channels[ch].nodes.as_slice(), [only]
            if is_default_value(channels[ch].op, only.val, tolerances));
        if elide {
            debug!(
                "omitting constant {} channel {}",
                channels[ch].op.name(),
                ch
            );
            channels.remove(ch);
        }
    }

    channels.sort_by_key(|c| c.id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(time: Tick, val: f32, derivative: f32) -> SplineNode {
        SplineNode::new(time, val, derivative)
    }

    #[test]
    fn equal_nodes_compares_both_values() {
        let a = node(5, 1.0, 0.0);
        let b = node(5, 2.0, 0.0);
        assert!(!equal_nodes(&a, &b, 0.1, 0.01));
        assert!(equal_nodes(&a, &node(5, 1.05, 0.0), 0.1, 0.01));
        assert!(!equal_nodes(&a, &node(6, 1.0, 0.0), 0.1, 0.01));
    }

    #[test]
    fn evaluate_nodes_holds_outside_the_range() {
        let nodes = [node(0, 1.0, 0.5), node(10, 2.0, 0.5)];
        assert_eq!(evaluate_nodes(&nodes, -3), (1.0, 0.0));
        assert_eq!(evaluate_nodes(&nodes, 10), (2.0, 0.5));
        assert_eq!(evaluate_nodes(&nodes, 99), (2.0, 0.0));
        let (v, _) = evaluate_nodes(&nodes, 0);
        assert_eq!(v, 1.0);
    }

    #[test]
    fn collinear_middle_node_is_pruned() {
        let mut nodes = vec![node(0, 0.0, 1.0), node(5, 5.0, 1.0), node(10, 10.0, 1.0)];
        prune_nodes(&mut nodes, 0.01, 0.01);
        assert_eq!(nodes, vec![node(0, 0.0, 1.0), node(10, 10.0, 1.0)]);
    }

    #[test]
    fn flat_step_does_not_collapse() {
        let mut nodes = vec![node(0, 0.0, 0.0), node(10, 1.0, 0.0)];
        prune_nodes(&mut nodes, 0.01, 0.01);
        assert_eq!(nodes.len(), 2);
    }
}

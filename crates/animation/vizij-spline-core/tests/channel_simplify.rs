use vizij_spline_core::fit::{
    evaluate_nodes, prune_channels, sum_nodes, summable_channel, uniform_scale_channels, Channel,
    SplineNode,
};
use vizij_spline_core::{MatrixOpId, MatrixOperationType, Tick, Tolerances};

use MatrixOperationType::*;

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn channel(op: MatrixOperationType, id: u8, nodes: &[(Tick, f32, f32)]) -> Channel {
    Channel {
        op,
        id: MatrixOpId(id),
        nodes: nodes
            .iter()
            .map(|&(t, v, d)| SplineNode::new(t, v, d))
            .collect(),
    }
}

#[test]
fn neutral_scale_constant_is_dropped() {
    let mut channels = vec![channel(ScaleX, 0, &[(0, 1.0, 0.0)])];
    prune_channels(&mut channels, &Tolerances::default());
    assert!(channels.is_empty());
}

#[test]
fn non_neutral_constants_survive() {
    let mut channels = vec![
        channel(TranslateX, 0, &[(0, 0.5, 0.0)]),
        channel(RotateAboutY, 1, &[(0, 0.0, 0.0)]),
    ];
    prune_channels(&mut channels, &Tolerances::default());
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].op, TranslateX);
}

#[test]
fn adjacent_translations_sum() {
    let mut channels = vec![
        channel(TranslateX, 0, &[(0, 1.0, 0.1), (10, 2.0, 0.1)]),
        channel(TranslateX, 1, &[(0, 3.0, 0.1), (10, 4.0, 0.1)]),
    ];
    prune_channels(&mut channels, &Tolerances::default());
    assert_eq!(channels.len(), 1);
    let merged = &channels[0];
    assert_eq!(merged.id, MatrixOpId(0));
    let times: Vec<Tick> = merged.nodes.iter().map(|n| n.time).collect();
    assert_eq!(times, vec![0, 10]);
    approx(merged.nodes[0].val, 4.0, 1e-6);
    approx(merged.nodes[1].val, 6.0, 1e-6);
}

#[test]
fn shared_end_node_keeps_both_slopes() {
    let a = [(0, 1.0, 0.1), (10, 2.0, 0.1)];
    let b = [(0, 3.0, 0.1), (10, 4.0, 0.1)];
    let mut channels = vec![channel(TranslateX, 0, &a), channel(TranslateX, 1, &b)];
    prune_channels(&mut channels, &Tolerances::default());
    let merged = &channels[0].nodes;
    approx(merged[0].derivative, 0.2, 1e-6);
    approx(merged[1].derivative, 0.2, 1e-6);

    let a = &channel(TranslateX, 0, &a).nodes;
    let b = &channel(TranslateX, 1, &b).nodes;
    for t in 0..=10 {
        let (s, _) = evaluate_nodes(merged, t);
        let (va, _) = evaluate_nodes(a, t);
        let (vb, _) = evaluate_nodes(b, t);
        approx(s, va + vb, 1e-4);
    }
}

#[test]
fn opposite_constants_cancel_and_are_dropped() {
    let mut channels = vec![
        channel(TranslateZ, 2, &[(0, 0.5, 0.0)]),
        channel(TranslateZ, 4, &[(0, -0.5, 0.0)]),
    ];
    prune_channels(&mut channels, &Tolerances::default());
    assert!(channels.is_empty());
}

#[test]
fn summing_crosses_only_commuting_operations() {
    let flat = &[(0, 1.0, 0.0), (10, 2.0, 0.0)];
    let chans = |ops: &[MatrixOperationType]| -> Vec<Channel> {
        ops.iter()
            .enumerate()
            .map(|(i, &op)| channel(op, i as u8, flat))
            .collect()
    };

    assert_eq!(summable_channel(&chans(&[RotateAboutX, RotateAboutX]), 0), Some(1));
    assert_eq!(
        summable_channel(&chans(&[RotateAboutX, TranslateX, RotateAboutX]), 0),
        None
    );
    assert_eq!(
        summable_channel(&chans(&[RotateAboutX, RotateAboutY, RotateAboutX]), 0),
        None
    );
    assert_eq!(
        summable_channel(&chans(&[TranslateX, TranslateY, TranslateX]), 0),
        Some(2)
    );
    assert_eq!(
        summable_channel(&chans(&[TranslateX, ScaleX, TranslateX]), 0),
        None
    );
    assert_eq!(
        summable_channel(&chans(&[ScaleX, ScaleY, ScaleZ, ScaleX]), 0),
        Some(3)
    );
    assert_eq!(summable_channel(&chans(&[ScaleX, RotateAboutX, ScaleX]), 0), None);
    assert_eq!(summable_channel(&chans(&[TranslateX]), 0), None);
}

#[test]
fn matching_scale_axes_collapse_to_uniform_scale() {
    let nodes = &[(0, 1.0, 0.0), (10, 2.0, 0.05), (20, 1.5, 0.0)];
    let mut channels = vec![
        channel(TranslateX, 0, &[(0, 3.0, 0.0)]),
        channel(ScaleX, 4, nodes),
        channel(ScaleY, 5, nodes),
        channel(ScaleZ, 6, nodes),
    ];
    let tol = Tolerances::default();
    assert!(uniform_scale_channels(&channels, 1, &tol));
    assert!(!uniform_scale_channels(&channels, 0, &tol));
    assert!(!uniform_scale_channels(&channels, 2, &tol));

    prune_channels(&mut channels, &tol);
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[1].op, ScaleUniformly);
    assert_eq!(channels[1].id, MatrixOpId(7));
    // The collapsed channel evaluates like any of the originals.
    for t in 0..=20 {
        let (v, _) = evaluate_nodes(&channels[1].nodes, t);
        let expected: Vec<SplineNode> = nodes
            .iter()
            .map(|&(t, v, d)| SplineNode::new(t, v, d))
            .collect();
        let (e, _) = evaluate_nodes(&expected, t);
        approx(v, e, 1e-6);
    }
}

#[test]
fn scale_axes_collapse_in_any_order() {
    let nodes = &[(0, 1.0, 0.0), (10, 2.0, 0.0)];
    let channels = vec![
        channel(ScaleZ, 0, nodes),
        channel(ScaleX, 1, nodes),
        channel(ScaleY, 2, nodes),
    ];
    assert!(uniform_scale_channels(&channels, 0, &Tolerances::default()));
}

#[test]
fn differing_scale_axes_do_not_collapse() {
    let channels = vec![
        channel(ScaleX, 0, &[(0, 1.0, 0.0), (10, 2.0, 0.0)]),
        channel(ScaleY, 1, &[(0, 1.0, 0.0), (10, 2.5, 0.0)]),
        channel(ScaleZ, 2, &[(0, 1.0, 0.0), (10, 2.0, 0.0)]),
    ];
    assert!(!uniform_scale_channels(&channels, 0, &Tolerances::default()));

    let short = vec![
        channel(ScaleX, 0, &[(0, 1.0, 0.0), (10, 2.0, 0.0)]),
        channel(ScaleY, 1, &[(0, 1.0, 0.0), (10, 2.0, 0.0)]),
        channel(ScaleZ, 2, &[(0, 1.0, 0.0)]),
    ];
    assert!(!uniform_scale_channels(&short, 0, &Tolerances::default()));
}

#[test]
fn summed_channel_evaluates_to_the_sum() {
    let a = [
        SplineNode::new(0, 0.0, 0.1),
        SplineNode::new(10, 1.0, 0.0),
        SplineNode::new(20, 0.5, -0.05),
    ];
    let b = [SplineNode::new(5, 2.0, 0.0), SplineNode::new(15, 3.0, 0.2)];
    let sum = sum_nodes(&a, &b);

    let times: Vec<Tick> = sum.iter().map(|n| n.time).collect();
    assert_eq!(times, vec![0, 5, 10, 15, 20]);
    for t in 5..=15 {
        let (s, _) = evaluate_nodes(&sum, t);
        let (va, _) = evaluate_nodes(&a, t);
        let (vb, _) = evaluate_nodes(&b, t);
        approx(s, va + vb, 1e-4);
    }
}

#[test]
fn constant_contributes_no_nodes() {
    let a = [SplineNode::new(0, 1.0, 0.0), SplineNode::new(10, 2.0, 0.0)];
    let b = [SplineNode::new(0, 5.0, 0.0)];
    let sum = sum_nodes(&a, &b);
    assert_eq!(
        sum,
        vec![SplineNode::new(0, 6.0, 0.0), SplineNode::new(10, 7.0, 0.0)]
    );
    assert_eq!(sum_nodes(&b, &a), sum);
}

#[test]
fn channels_end_sorted_by_id() {
    let two = &[(0, 1.5, 0.0), (10, 2.0, 0.0)];
    let mut channels = vec![
        channel(RotateAboutX, 3, two),
        channel(TranslateX, 1, two),
        channel(ScaleX, 2, two),
    ];
    prune_channels(&mut channels, &Tolerances::default());
    let ids: Vec<u8> = channels.iter().map(|c| c.id.0).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

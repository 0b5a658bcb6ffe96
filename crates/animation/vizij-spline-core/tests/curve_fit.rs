use vizij_spline_core::cubic::{CubicCurve, CubicInit};
use vizij_spline_core::fit::{fit_curve, prune_nodes, SplineNode};
use vizij_spline_core::{MatrixOperationType, SplineError, Tolerances};
use vizij_spline_fixtures::{samples, SampleStream};

fn op_of(stream: &SampleStream) -> MatrixOperationType {
    serde_json::from_value(serde_json::Value::String(stream.op.clone()))
        .expect("fixture op should name a matrix operation")
}

fn cubic_between(a: &SplineNode, b: &SplineNode) -> CubicCurve {
    CubicCurve::new(&CubicInit::new(
        a.val,
        a.derivative,
        b.val,
        b.derivative,
        (b.time - a.time) as f32,
    ))
}

/// Every sample strictly between two adjacent nodes is reproduced within `tolerance`.
fn assert_fit_bound(stream: &SampleStream, nodes: &[SplineNode], tolerance: f32) {
    for pair in nodes.windows(2) {
        let cubic = cubic_between(&pair[0], &pair[1]);
        for (i, &t) in stream.times.iter().enumerate() {
            if t <= pair[0].time || t >= pair[1].time {
                continue;
            }
            let err = (cubic.evaluate((t - pair[0].time) as f32) - stream.values[i]).abs();
            assert!(
                err < tolerance,
                "{}: sample at t={t} off by {err} (tolerance {tolerance})",
                stream.op
            );
        }
    }
}

#[test]
fn straight_line_collapses_to_its_endpoints() {
    let nodes = fit_curve(&[0, 10, 20], &[0.0, 5.0, 10.0], &[0.5, 0.5, 0.5], 0.1).unwrap();
    assert_eq!(
        nodes,
        vec![SplineNode::new(0, 0.0, 0.5), SplineNode::new(20, 10.0, 0.5)]
    );
}

#[test]
fn two_samples_are_always_accepted() {
    let nodes = fit_curve(&[3, 9], &[1.0, -4.0], &[0.0, 100.0], 1e-6).unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0], SplineNode::new(3, 1.0, 0.0));
    assert_eq!(nodes[1], SplineNode::new(9, -4.0, 100.0));
}

#[test]
fn fewer_than_two_samples_is_rejected() {
    assert_eq!(
        fit_curve(&[], &[], &[], 0.1).unwrap_err(),
        SplineError::InsufficientSamples {
            required: 2,
            actual: 0
        }
    );
}

#[test]
fn fixtures_fit_within_tolerance() {
    let tolerances = Tolerances::default();
    for name in samples::keys() {
        let stream = samples::load(&name).unwrap();
        let tolerance = op_of(&stream).tolerance(&tolerances);
        let nodes =
            fit_curve(&stream.times, &stream.values, &stream.derivatives, tolerance).unwrap();

        assert_eq!(nodes.first().map(|n| n.time), stream.times.first().copied());
        assert_eq!(nodes.last().map(|n| n.time), stream.times.last().copied());
        assert!(nodes.windows(2).all(|p| p[0].time < p[1].time), "{name}");
        assert!(nodes.len() < stream.len(), "{name} did not compress");
        assert_fit_bound(&stream, &nodes, tolerance);
    }
}

#[test]
fn smooth_sine_needs_few_nodes() {
    let stream = samples::load("sine_rotation").unwrap();
    let tolerance = Tolerances::default().rotate;
    let nodes = fit_curve(&stream.times, &stream.values, &stream.derivatives, tolerance).unwrap();
    assert!(nodes.len() < stream.len() / 4, "got {} nodes", nodes.len());
}

#[test]
fn cubic_ease_is_a_single_segment() {
    let stream = samples::load("ease_translate").unwrap();
    let tolerance = Tolerances::default().translate;
    let mut nodes =
        fit_curve(&stream.times, &stream.values, &stream.derivatives, tolerance).unwrap();
    assert_eq!(nodes.len(), 2);

    // Flat at both ends but the values differ, so it is not a constant.
    let tol = Tolerances::default();
    prune_nodes(&mut nodes, tol.translate, tol.derivative_angle);
    assert_eq!(nodes.len(), 2);
}

#[test]
fn pruning_is_idempotent() {
    let tol = Tolerances::default();
    for name in samples::keys() {
        let stream = samples::load(&name).unwrap();
        let tolerance = op_of(&stream).tolerance(&tol);
        let mut once =
            fit_curve(&stream.times, &stream.values, &stream.derivatives, tolerance).unwrap();
        prune_nodes(&mut once, tolerance, tol.derivative_angle);
        let mut twice = once.clone();
        prune_nodes(&mut twice, tolerance, tol.derivative_angle);
        assert_eq!(once, twice, "{name}");
    }
}

#[test]
fn flat_channel_collapses_to_a_constant() {
    let tol = Tolerances::default();
    let mut nodes = fit_curve(
        &[0, 10, 20, 30],
        &[2.0, 2.001, 1.999, 2.0],
        &[0.0, 0.0, 0.0, 0.0],
        tol.translate,
    )
    .unwrap();
    prune_nodes(&mut nodes, tol.translate, tol.derivative_angle);
    assert_eq!(nodes, vec![SplineNode::new(0, 2.0, 0.0)]);
}

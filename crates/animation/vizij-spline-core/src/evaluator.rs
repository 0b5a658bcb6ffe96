//! Bulk evaluation of many independent spline cursors.
//!
//! Per-slot state lives in parallel arrays so that `advance_frame` walks
//! contiguous memory. Each slot caches the cubic of its current segment; the
//! cubic is rebuilt only when the cursor leaves the segment, and the new
//! segment is searched for starting at the old one.

use serde::{Deserialize, Serialize};

use crate::compact_spline::CompactSpline;
use crate::config::EvaluatorConfig;
use crate::cubic::CubicCurve;
use crate::error::SplineError;
use crate::range::Range;
use crate::Result;

/// How a slot plays its spline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplinePlayback {
    /// Starting x, in the spline's own x coordinates.
    pub start_x: f32,
    /// Spline x advanced per unit of `advance_frame` delta.
    pub playback_rate: f32,
    /// Wrap x back to the start when it runs past the end.
    pub repeat: bool,
}

impl Default for SplinePlayback {
    fn default() -> Self {
        Self {
            start_x: 0.0,
            playback_rate: 1.0,
            repeat: false,
        }
    }
}

/// Evaluates a dense table of spline slots. Splines are borrowed, never copied.
#[derive(Clone, Debug)]
pub struct BulkSplineEvaluator<'a> {
    default_value: f32,
    splines: Vec<Option<&'a CompactSpline>>,
    xs: Vec<f32>,
    playback_rates: Vec<f32>,
    repeats: Vec<bool>,
    segments: Vec<usize>,
    segment_xs: Vec<Range>,
    cubics: Vec<CubicCurve>,
    y_ranges: Vec<Option<Range>>,
    ys: Vec<f32>,
    derivatives: Vec<f32>,
}

impl Default for BulkSplineEvaluator<'_> {
    fn default() -> Self {
        Self::new(&EvaluatorConfig::default())
    }
}

impl<'a> BulkSplineEvaluator<'a> {
    pub fn new(config: &EvaluatorConfig) -> Self {
        let mut evaluator = Self {
            default_value: config.default_value,
            splines: Vec::new(),
            xs: Vec::new(),
            playback_rates: Vec::new(),
            repeats: Vec::new(),
            segments: Vec::new(),
            segment_xs: Vec::new(),
            cubics: Vec::new(),
            y_ranges: Vec::new(),
            ys: Vec::new(),
            derivatives: Vec::new(),
        };
        evaluator.set_num_indices(config.initial_indices);
        evaluator
    }

    #[inline]
    pub fn num_indices(&self) -> usize {
        self.splines.len()
    }

    /// Grow or shrink the slot table. New slots are inert.
    pub fn set_num_indices(&mut self, num_indices: usize) {
        self.splines.resize(num_indices, None);
        self.xs.resize(num_indices, 0.0);
        self.playback_rates.resize(num_indices, 1.0);
        self.repeats.resize(num_indices, false);
        self.segments.resize(num_indices, 0);
        self.segment_xs.resize(num_indices, Range::empty());
        self.cubics.resize(num_indices, CubicCurve::default());
        self.y_ranges.resize(num_indices, None);
        self.ys.resize(num_indices, self.default_value);
        self.derivatives.resize(num_indices, 0.0);
    }

    #[inline]
    fn check(&self, index: usize) -> Result<()> {
        if index < self.splines.len() {
            Ok(())
        } else {
            Err(SplineError::IndexOutOfRange {
                index,
                len: self.splines.len(),
            })
        }
    }

    /// Assign `spline` to slot `index` and evaluate it at `playback.start_x`.
    pub fn set_spline(
        &mut self,
        index: usize,
        spline: &'a CompactSpline,
        playback: SplinePlayback,
    ) -> Result<()> {
        self.check(index)?;
        self.splines[index] = Some(spline);
        self.xs[index] = playback.start_x;
        self.playback_rates[index] = playback.playback_rate;
        self.repeats[index] = playback.repeat;
        self.segments[index] = 0;
        self.segment_xs[index] = Range::empty();
        self.update(index, true);
        Ok(())
    }

    /// Detach the slot's spline; the slot reports the default value again.
    pub fn clear_spline(&mut self, index: usize) -> Result<()> {
        self.check(index)?;
        self.splines[index] = None;
        self.xs[index] = 0.0;
        self.segments[index] = 0;
        self.segment_xs[index] = Range::empty();
        self.ys[index] = self.default_value;
        self.derivatives[index] = 0.0;
        Ok(())
    }

    /// Treat the slot's value as modular over `range`, or as plain when `None`.
    ///
    /// Values more than half the range length outside it are wrapped back in by
    /// whole lengths; closer values pass through unchanged.
    pub fn set_y_range(&mut self, index: usize, range: Option<Range>) -> Result<()> {
        self.check(index)?;
        self.y_ranges[index] = range.filter(|r| r.length() > 0.0);
        self.update(index, false);
        Ok(())
    }

    /// Jump the slot to `x`. The segment is searched for from scratch.
    pub fn set_x(&mut self, index: usize, x: f32) -> Result<()> {
        self.check(index)?;
        self.xs[index] = x;
        self.update(index, true);
        Ok(())
    }

    pub fn set_playback_rate(&mut self, index: usize, playback_rate: f32) -> Result<()> {
        self.check(index)?;
        self.playback_rates[index] = playback_rate;
        Ok(())
    }

    /// Move every active slot forward by `delta_x * playback_rate` and
    /// re-evaluate it.
    pub fn advance_frame(&mut self, delta_x: f32) {
        for i in 0..self.splines.len() {
            if self.splines[i].is_none() {
                continue;
            }
            self.xs[i] += delta_x * self.playback_rates[i];
            self.update(i, false);
        }
    }

    /// Current value of slot `index`. Panics if `index` is out of range.
    #[inline]
    pub fn y(&self, index: usize) -> f32 {
        self.ys[index]
    }

    /// Current slope of slot `index`. Panics if `index` is out of range.
    #[inline]
    pub fn derivative(&self, index: usize) -> f32 {
        self.derivatives[index]
    }

    /// Current x of slot `index`. Panics if `index` is out of range.
    #[inline]
    pub fn x(&self, index: usize) -> f32 {
        self.xs[index]
    }

    /// End x of the slot's spline, or 0 for an inert slot.
    pub fn end_x(&self, index: usize) -> f32 {
        self.splines[index].map_or(0.0, CompactSpline::end_x)
    }

    /// True if the slot has a spline.
    #[inline]
    pub fn valid(&self, index: usize) -> bool {
        self.splines.get(index).is_some_and(Option::is_some)
    }

    #[inline]
    pub fn ys(&self) -> &[f32] {
        &self.ys
    }

    #[inline]
    pub fn derivatives(&self) -> &[f32] {
        &self.derivatives
    }

    fn update(&mut self, i: usize, seek: bool) {
        let Some(spline) = self.splines[i] else {
            return;
        };
        if spline.is_empty() {
            self.ys[i] = self.default_value;
            self.derivatives[i] = 0.0;
            return;
        }

        let start = spline.start_x();
        let end = spline.end_x();
        let mut x = self.xs[i];
        if self.repeats[i] && end > start && (x < start || x >= end) {
            x = start + (x - start).rem_euclid(end - start);
            self.xs[i] = x;
        }
        let outside = x < start || x > end;
        let x = x.clamp(start, end);

        if seek || !self.segment_xs[i].contains(x) {
            let guess = if seek { 0 } else { self.segments[i] };
            let segment = spline.index_for_x(x, guess);
            let init = spline.segment_init(segment);
            let segment_start = if spline.num_nodes() > 1 {
                spline.node_x(segment)
            } else {
                start
            };
            self.segments[i] = segment;
            self.segment_xs[i] = Range::new(segment_start, segment_start + init.width_x);
            self.cubics[i] = CubicCurve::new(&init);
        }

        let local_x = x - self.segment_xs[i].start();
        let cubic = &self.cubics[i];
        let mut y = cubic.evaluate(local_x);
        if let Some(range) = self.y_ranges[i] {
            if range.distance_from(y) > 0.5 * range.length() {
                y = range.normalize_wildly_outside_value(y);
            }
        }
        self.ys[i] = y;
        self.derivatives[i] = if outside {
            0.0
        } else {
            cubic.derivative(local_x)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact_spline::AddMode;

    #[test]
    fn inert_slots_report_the_default_value() {
        let config = EvaluatorConfig {
            initial_indices: 3,
            default_value: 7.0,
        };
        let mut ev = BulkSplineEvaluator::new(&config);
        ev.advance_frame(1.0);
        assert_eq!(ev.ys(), &[7.0, 7.0, 7.0]);
        assert!(!ev.valid(1));
        assert!(ev.set_x(3, 0.0).is_err());
    }

    #[test]
    fn single_node_spline_is_flat() {
        let mut s = CompactSpline::with_capacity(1);
        s.init(Range::new(2.0, 2.0), 1.0);
        s.add_node(0.0, 2.0, 0.0, AddMode::Reject).unwrap();
        let mut ev = BulkSplineEvaluator::default();
        ev.set_num_indices(1);
        ev.set_spline(0, &s, SplinePlayback::default()).unwrap();
        ev.advance_frame(5.0);
        assert_eq!(ev.y(0), 2.0);
        assert_eq!(ev.derivative(0), 0.0);
    }
}

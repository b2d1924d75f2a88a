//! # Tide Curve Interpolation
//!
//! Rebuilds a continuous tide curve from a sparse day of extrema and samples
//! it for display.
//!
//! ## Model
//! Between two consecutive extrema the water level is modelled as half a
//! cosine cycle:
//! ```text
//! height(p) = mean + amplitude * cos(pi * p)   (high -> low)
//! height(p) = mean - amplitude * cos(pi * p)   (any other pair)
//! ```
//! where `p` is the normalized progress between the two event times. When the
//! kinds agree with the heights (the HIGH is the higher one) both endpoint
//! heights are reproduced exactly. The curve is a smooth local bridge, not a
//! harmonic prediction, and says nothing outside its bracket.
//!
//! Two adjacent extrema of the same kind are not special-cased: they are
//! treated as a rising swing from the lower height to the higher one.
//!
//! ## Failure Modes
//! None. Fewer than two distinct timestamps, or a reference instant outside
//! the day's events, produce [`TideSeriesResult::empty`].

use crate::mapper::{self, VerticalScale};
use crate::{HeightUnit, TideExtremum, TideKind, TideSeriesResult};
use chrono::{DateTime, Utc};
use std::f64::consts::PI;

/// Half-cycle cosine bridge between two bracketing extrema.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalfCycle {
    pub prev: TideExtremum,
    pub next: TideExtremum,
}

impl HalfCycle {
    pub fn mean(&self) -> f64 {
        (self.prev.height + self.next.height) / 2.0
    }

    pub fn amplitude(&self) -> f64 {
        (self.next.height - self.prev.height).abs() / 2.0
    }

    pub fn is_high_to_low(&self) -> bool {
        self.prev.kind == TideKind::High && self.next.kind == TideKind::Low
    }

    /// Water height at normalized progress `p`.
    pub fn height_at(&self, p: f64) -> f64 {
        let swing = self.amplitude() * (PI * p).cos();
        if self.is_high_to_low() {
            self.mean() + swing
        } else {
            self.mean() - swing
        }
    }

    /// Normalized position of `now` in the bracket, clamped to `0.0..=1.0`.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        let duration = (self.next.time - self.prev.time).num_milliseconds().max(1);
        let elapsed = (now - self.prev.time).num_milliseconds();
        (elapsed as f64 / duration as f64).clamp(0.0, 1.0)
    }
}

/// Find the pair of extrema surrounding `now`.
///
/// `sorted` must be ordered by time. The bracket is the first consecutive pair
/// with distinct times such that `prev.time <= now <= next.time`, which makes
/// an instant that lands exactly on an event resolve to the interval it
/// bounds. Returns `None` when no such pair exists: fewer than two distinct
/// timestamps, or `now` before the first or after the last event.
pub fn bracket(sorted: &[TideExtremum], now: DateTime<Utc>) -> Option<HalfCycle> {
    sorted
        .windows(2)
        .find(|w| w[0].time < w[1].time && w[0].time <= now && now <= w[1].time)
        .map(|w| HalfCycle {
            prev: w[0],
            next: w[1],
        })
}

/// Compute the curve samples and current marker for a canvas, labelled in meters.
pub fn compute_series(
    extrema: &[TideExtremum],
    now: DateTime<Utc>,
    canvas_width: u32,
    canvas_height: u32,
) -> TideSeriesResult {
    compute_series_in(extrema, now, canvas_width, canvas_height, HeightUnit::Metric)
}

/// Like [`compute_series`], with the label formatted in `unit`.
pub fn compute_series_in(
    extrema: &[TideExtremum],
    now: DateTime<Utc>,
    canvas_width: u32,
    canvas_height: u32,
    unit: HeightUnit,
) -> TideSeriesResult {
    let mut sorted = extrema.to_vec();
    sorted.sort_by_key(|e| e.time);

    let Some(cycle) = bracket(&sorted, now) else {
        return TideSeriesResult::empty(canvas_height);
    };

    let progress = cycle.progress(now);
    let current_height = cycle.height_at(progress);
    let scale = VerticalScale::new(
        cycle.prev.height,
        cycle.next.height,
        cycle.amplitude(),
        canvas_height,
    );

    TideSeriesResult {
        samples: mapper::sample_curve(|p| cycle.height_at(p), &scale, canvas_width),
        current_position: crate::SamplePoint {
            x: mapper::to_x(progress, canvas_width),
            y: scale.to_y(current_height),
        },
        current_height_label: unit.format(current_height),
        current_height: Some(current_height),
    }
}

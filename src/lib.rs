//! # Tide Sampler Core Library
//!
//! This library turns a sparse day of tide extrema (high and low water events)
//! into a continuous, renderable tide curve, and manages the asynchronous fetch
//! lifecycle that feeds it as the caller's location and options change.
//!
//! ## Design Philosophy
//!
//! ### Pull-based rendering
//! - **Extrema are the only stored data**: a [`TideSummary`] holds one day of
//!   high/low events and nothing else
//! - **Curves are derived**: [`interpolation::compute_series`] rebuilds the
//!   sample series and the "now" marker from a summary on every render, since
//!   the reference instant moves continuously
//! - **Pure math**: the engine and the coordinate mapper never fail and never
//!   suspend; degenerate input yields an empty [`TideSeriesResult`]
//!
//! ### Fetch lifecycle
//! 1. **Query**: the caller hands a [`query::Query`] to a
//!    [`query::QueryController`] as often as it likes
//! 2. **Fetch**: a changed query (by value) issues one request to an
//!    [`extremum_store::ExtremumStore`]
//! 3. **Commit**: only the result of the latest query reaches
//!    [`query::QueryState`]; superseded results are dropped silently
//!
//! ## Core Types
//! - [`TideExtremum`]: one high or low water event
//! - [`TideSummary`]: a time-ordered day of extrema
//! - [`SamplePoint`]: a pixel coordinate on the plot
//! - [`TideSeriesResult`]: render-ready samples plus the current position

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod extremum_store;
pub mod fallback;
pub mod interpolation;
pub mod lunar;
pub mod mapper;
pub mod query;
pub mod renderer;

/// Whether an extremum is a high or a low water event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TideKind {
    High,
    Low,
}

/// A single high or low water event.
///
/// Heights are always stored in meters; unit conversion only happens when a
/// label is formatted.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use tide_sampler_lib::{TideExtremum, TideKind};
///
/// let low = TideExtremum {
///     time: Utc.with_ymd_and_hms(2024, 6, 16, 8, 0, 0).unwrap(),
///     height: 0.3,
///     kind: TideKind::Low,
/// };
/// assert_eq!(low.kind, TideKind::Low);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideExtremum {
    /// Instant of the event
    pub time: DateTime<Utc>,
    /// Water height in meters
    pub height: f64,
    pub kind: TideKind,
}

/// One calendar day of tide extrema, ordered by time.
///
/// Construction sorts stably, so extrema sharing a timestamp keep their input
/// order. Deserializing goes through the same constructor. Nothing else is
/// guaranteed: a summary may be empty, hold a single entry, or contain two
/// adjacent events of the same kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<TideExtremum>", into = "Vec<TideExtremum>")]
pub struct TideSummary {
    extrema: Vec<TideExtremum>,
}

impl From<Vec<TideExtremum>> for TideSummary {
    fn from(extrema: Vec<TideExtremum>) -> Self {
        Self::new(extrema)
    }
}

impl From<TideSummary> for Vec<TideExtremum> {
    fn from(summary: TideSummary) -> Self {
        summary.extrema
    }
}

impl TideSummary {
    pub fn new(mut extrema: Vec<TideExtremum>) -> Self {
        extrema.sort_by_key(|e| e.time);
        Self { extrema }
    }

    pub fn extrema(&self) -> &[TideExtremum] {
        &self.extrema
    }

    pub fn len(&self) -> usize {
        self.extrema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extrema.is_empty()
    }
}

/// A point in plot coordinates (pixels, y grows downwards).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SamplePoint {
    pub x: i32,
    pub y: i32,
}

/// Render-ready output of the interpolation engine.
///
/// The empty variant (no samples, marker at the left edge halfway down, blank
/// label) stands for "not enough data to draw a curve". It is distinct from
/// "loading" and "failed", which live in [`query::QueryState`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideSeriesResult {
    /// Curve samples, ordered left to right
    pub samples: Vec<SamplePoint>,
    /// Where "now" sits on the curve
    pub current_position: SamplePoint,
    /// Current height formatted with two decimals and a unit suffix
    pub current_height_label: String,
    /// Current height in meters, `None` for the empty variant
    pub current_height: Option<f64>,
}

impl TideSeriesResult {
    /// The "no curve" result for a canvas of the given height.
    pub fn empty(canvas_height: u32) -> Self {
        Self {
            samples: Vec::new(),
            current_position: SamplePoint {
                x: 0,
                y: (canvas_height / 2) as i32,
            },
            current_height_label: String::new(),
            current_height: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Unit used when formatting height labels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightUnit {
    #[default]
    Metric,
    Imperial,
}

impl HeightUnit {
    const FEET_PER_METER: f64 = 3.280_84;

    pub fn suffix(self) -> &'static str {
        match self {
            HeightUnit::Metric => "m",
            HeightUnit::Imperial => "ft",
        }
    }

    /// Convert a height in meters into this unit.
    pub fn from_meters(self, meters: f64) -> f64 {
        match self {
            HeightUnit::Metric => meters,
            HeightUnit::Imperial => meters * Self::FEET_PER_METER,
        }
    }

    /// `"1.20 m"` style label.
    pub fn format(self, meters: f64) -> String {
        format!("{:.2} {}", self.from_meters(meters), self.suffix())
    }
}

//! # Offline Tide Model
//!
//! Produces a plausible day of tide extrema when no tide service is
//! reachable. The water level is a two-constituent equilibrium tide:
//!
//! - **M2** (principal lunar, 12.42 h): phase tied to the real-time clock and
//!   shifted by longitude, since the Moon transits later further west
//! - **S2** (principal solar, 12.00 h): phase advanced by twice the Moon's
//!   phase angle, so the two constituents reinforce at new/full moon (spring
//!   tides) and partly cancel at the quarters (neap tides)
//!
//! The level is evaluated across the UTC day on a fixed step, optionally
//! smoothed with a centered moving average, and every local maximum or
//! minimum becomes a HIGH or LOW extremum.
//!
//! ### Accuracy Trade-offs
//! - ✅ **Correct period**: semidiurnal cycle with a spring/neap envelope
//! - ❌ **No station harmonics**: amplitudes are those of Portland, ME
//! - ❌ **No diurnal inequality**: both daily highs reach the same height
//! - ❌ **No meteorological effects**

use crate::{lunar, TideExtremum, TideKind, TideSummary};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::f64::consts::TAU;

/// Sampling step used when the caller does not ask for one.
pub const DEFAULT_STEP_MINUTES: u32 = 10;

/// Lunar M2 amplitude (Portland, ME), meters.
const A_M2: f64 = 1.375;
const P_M2_HRS: f64 = 12.42;

/// Solar S2 amplitude (Portland, ME), meters.
const A_S2: f64 = 0.207;

/// Moon transit to local high water, hours.
const LUNITIDAL_OFFSET_HRS: f64 = 3.59;

const LUNAR_DAY_HRS: f64 = 24.84;

/// Mean level above chart datum, meters.
const MEAN_LEVEL: f64 = 1.524;

/// Highest level the model can reach.
pub const MAX_LEVEL: f64 = MEAN_LEVEL + A_M2 + A_S2;

/// Lowest level the model can reach.
pub const MIN_LEVEL: f64 = MEAN_LEVEL - A_M2 - A_S2;

/// Water level at `t` for a site at longitude `lon`.
///
/// `moon_angle` is the lunar phase angle in radians (0 = new moon).
pub fn level_at(t: DateTime<Utc>, lon: f64, moon_angle: f64) -> f64 {
    let period = P_M2_HRS * 3600.0;
    let secs = t.timestamp() as f64
        + LUNITIDAL_OFFSET_HRS * 3600.0
        + lon / 360.0 * LUNAR_DAY_HRS * 3600.0;
    let theta_m2 = secs.rem_euclid(period) / period * TAU;
    let theta_s2 = theta_m2 + 2.0 * moon_angle;
    MEAN_LEVEL + A_M2 * theta_m2.sin() + A_S2 * theta_s2.sin()
}

/// Approximate the extrema of one UTC day at longitude `lon`.
///
/// `step_minutes` sets the resolution of the search (clamped to one minute
/// up to a whole day); `smooth_window_minutes` enables a moving average over roughly
/// that span before extrema are picked.
pub fn approximate_day(
    date: NaiveDate,
    lon: f64,
    step_minutes: u32,
    smooth_window_minutes: Option<u32>,
) -> TideSummary {
    let step = step_minutes.clamp(1, 24 * 60);
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(1);
    let moon_angle = lunar::moon_phase(start + Duration::hours(12)).angle();

    // one extra step on each side so events right at midnight are detectable
    let steps = (24 * 60 / step) as i64;
    let times: Vec<DateTime<Utc>> = (-1..=steps + 1)
        .map(|i| start + Duration::minutes(i * step as i64))
        .collect();
    let raw: Vec<f64> = times.iter().map(|&t| level_at(t, lon, moon_angle)).collect();
    let half_width = smooth_window_minutes.map_or(0, |w| (w / (2 * step)) as usize);
    let levels = moving_average(&raw, half_width);

    let extrema = times
        .iter()
        .skip(1)
        .zip(levels.windows(3))
        .filter(|(t, _)| start <= **t && **t < end)
        .filter_map(|(&time, w)| {
            let (before, height, after) = (w[0], w[1], w[2]);
            let kind = if height > before && height >= after {
                TideKind::High
            } else if height < before && height <= after {
                TideKind::Low
            } else {
                return None;
            };
            Some(TideExtremum { time, height, kind })
        })
        .collect();

    TideSummary::new(extrema)
}

/// Centered moving average; the window shrinks at the edges.
fn moving_average(values: &[f64], half_width: usize) -> Vec<f64> {
    if half_width == 0 {
        return values.to_vec();
    }
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half_width);
            let hi = (i + half_width + 1).min(values.len());
            let window = &values[lo..hi];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

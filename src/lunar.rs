//! Moon age from a low-precision phase routine (Schaefer 1985).
//!
//! Accuracy is about ±1 day, which is plenty for scaling the spring/neap
//! envelope of the offline tide model.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Mean synodic month in days.
pub const SYNODIC_MONTH_DAYS: f64 = 29.530_588_2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoonPhase {
    /// Days since new moon, `0.0..SYNODIC_MONTH_DAYS`.
    pub age_days: f64,
}

impl MoonPhase {
    /// Phase angle in radians, `0` at new moon and `pi` at full moon.
    pub fn angle(&self) -> f64 {
        self.age_days / SYNODIC_MONTH_DAYS * std::f64::consts::TAU
    }
}

/// Phase for a proleptic-Gregorian date; `day` may be fractional (UTC noon = x.5).
pub fn schaefer_phase(year: i32, month: u32, day: f64) -> MoonPhase {
    // Jan/Feb count as months 13/14 of the previous year
    let (mut y, mut m) = (year, month as i32);
    if m < 3 {
        y -= 1;
        m += 12;
    }
    m += 1;

    // days since the 1900-01-00 12 UT new moon epoch
    let days = (365.25 * y as f64).floor() + (30.6 * m as f64).floor() + day - 694_039.09;

    let cycles = days / SYNODIC_MONTH_DAYS;
    let age_days = (cycles - cycles.floor()) * SYNODIC_MONTH_DAYS;

    MoonPhase { age_days }
}

/// Phase at an instant.
pub fn moon_phase(at: DateTime<Utc>) -> MoonPhase {
    let day = at.day() as f64
        + (at.hour() as f64 + at.minute() as f64 / 60.0 + at.second() as f64 / 3600.0) / 24.0;
    schaefer_phase(at.year(), at.month(), day)
}

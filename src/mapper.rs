//! # Plot Coordinate Mapping
//!
//! Converts normalized progress (`0.0..=1.0` between two extrema) and tide
//! heights into integer plot coordinates. Nothing here knows about a drawing
//! backend; the ASCII and `embedded-graphics` renderers both consume the
//! resulting [`SamplePoint`]s.
//!
//! ## Layout
//! - **Horizontal**: linear, with a 2 px inset on each side
//! - **Vertical**: the bracketing heights padded by 20 % of the amplitude,
//!   with a 4 px inset top and bottom; higher water maps to a smaller `y`

use crate::SamplePoint;

/// Minimum number of curve samples regardless of canvas width.
pub const MIN_SAMPLES: usize = 32;

/// Roughly one sample per this many horizontal pixels.
pub const PIXELS_PER_SAMPLE: u32 = 6;

const X_INSET: f64 = 2.0;
const Y_INSET: f64 = 4.0;
const PADDING_RATIO: f64 = 0.2;

/// Number of samples to draw across a canvas `width` pixels wide.
pub fn sample_count(width: u32) -> usize {
    MIN_SAMPLES.max((width / PIXELS_PER_SAMPLE) as usize)
}

/// Map normalized progress to an x coordinate.
///
/// Canvases narrower than both insets collapse onto `x = 2`.
pub fn to_x(progress: f64, width: u32) -> i32 {
    let span = (width as f64 - 2.0 * X_INSET).max(0.0);
    (progress * span).round() as i32 + X_INSET as i32
}

/// Vertical scale spanning the two bracketing heights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VerticalScale {
    min: f64,
    max: f64,
    canvas_height: u32,
}

impl VerticalScale {
    pub fn new(h1: f64, h2: f64, amplitude: f64, canvas_height: u32) -> Self {
        let pad = PADDING_RATIO * amplitude;
        Self {
            min: h1.min(h2) - pad,
            max: h1.max(h2) + pad,
            canvas_height,
        }
    }

    /// Position of `height` within the padded range, `0.5` when the range is flat.
    pub fn normalize(&self, height: f64) -> f64 {
        if self.max == self.min {
            0.5
        } else {
            (height - self.min) / (self.max - self.min)
        }
    }

    pub fn to_y(&self, height: f64) -> i32 {
        let norm = self.normalize(height);
        let span = (self.canvas_height as f64 - 2.0 * Y_INSET).max(0.0);
        ((1.0 - norm) * span).round() as i32 + Y_INSET as i32
    }
}

/// Sample a curve defined over normalized progress.
///
/// Produces [`sample_count`] points with `p = i / (n - 1)`.
pub fn sample_curve<F>(curve: F, scale: &VerticalScale, width: u32) -> Vec<SamplePoint>
where
    F: Fn(f64) -> f64,
{
    let n = sample_count(width);
    let last = (n - 1) as f64;
    (0..n)
        .map(|i| {
            let p = i as f64 / last;
            SamplePoint {
                x: to_x(p, width),
                y: scale.to_y(curve(p)),
            }
        })
        .collect()
}

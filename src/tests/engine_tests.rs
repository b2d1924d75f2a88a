//! Sampling properties of the interpolation engine.

use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use tide_sampler_lib::interpolation::compute_series;
use tide_sampler_lib::mapper::sample_count;
use tide_sampler_lib::{TideExtremum, TideKind};

fn midnight() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 16, 0, 0, 0).unwrap()
}

/// Two alternating extrema with distinct times inside one day.
///
/// Kinds agree with the heights (the higher one is HIGH), which is what a
/// tide service reports and what the half-cycle model assumes.
fn pair() -> impl Strategy<Value = (TideExtremum, TideExtremum)> {
    (0i64..43_200, 1i64..43_200, -3.0f64..10.0, -3.0f64..10.0).prop_map(
        |(start, gap, h1, h2)| {
            let (k1, k2) = if h1 >= h2 {
                (TideKind::High, TideKind::Low)
            } else {
                (TideKind::Low, TideKind::High)
            };
            let a = TideExtremum {
                time: midnight() + Duration::seconds(start),
                height: h1,
                kind: k1,
            };
            let b = TideExtremum {
                time: a.time + Duration::seconds(gap),
                height: h2,
                kind: k2,
            };
            (a, b)
        },
    )
}

proptest! {
    #[test]
    fn boundary_instants_reproduce_extremum_heights((a, b) in pair()) {
        let at_a = compute_series(&[a, b], a.time, 400, 300);
        let at_b = compute_series(&[b, a], b.time, 400, 300);

        prop_assert!((at_a.current_height.unwrap() - a.height).abs() < 1e-9);
        prop_assert!((at_b.current_height.unwrap() - b.height).abs() < 1e-9);
    }

    #[test]
    fn sample_count_follows_width(
        (a, b) in pair(),
        width in 4u32..4000,
        height in 8u32..2000,
        fraction in 0.0f64..=1.0,
    ) {
        let span = (b.time - a.time).num_milliseconds() as f64;
        let now = a.time + Duration::milliseconds((span * fraction) as i64);
        let result = compute_series(&[a, b], now, width, height);

        prop_assert_eq!(result.samples.len(), sample_count(width));
        prop_assert_eq!(result.samples.len(), 32usize.max((width / 6) as usize));
    }

    #[test]
    fn samples_stay_inside_the_plot(
        (a, b) in pair(),
        width in 4u32..4000,
        height in 8u32..2000,
    ) {
        let result = compute_series(&[a, b], a.time, width, height);
        let max_x = width as i32 - 2;
        let max_y = height as i32 - 4;

        for pair in result.samples.windows(2) {
            prop_assert!(pair[0].x <= pair[1].x);
        }
        for s in &result.samples {
            prop_assert!((2..=max_x).contains(&s.x), "x {} outside [2, {}]", s.x, max_x);
            prop_assert!((4..=max_y).contains(&s.y), "y {} outside [4, {}]", s.y, max_y);
        }
    }

    #[test]
    fn a_single_timestamp_never_yields_a_curve(
        offset in 0i64..86_400,
        heights in prop::collection::vec(-3.0f64..10.0, 0..5),
        probe in -3_600i64..3_600,
    ) {
        let time = midnight() + Duration::seconds(offset);
        let extrema: Vec<TideExtremum> = heights
            .iter()
            .map(|&height| TideExtremum { time, height, kind: TideKind::High })
            .collect();
        let result = compute_series(&extrema, time + Duration::seconds(probe), 400, 300);

        prop_assert!(result.samples.is_empty());
        prop_assert_eq!(result.current_height_label, "");
        prop_assert_eq!(result.current_height, None);
    }
}

#[test]
fn low_to_high_midpoint_scenario() {
    let extrema = [
        TideExtremum {
            time: midnight() + Duration::hours(8),
            height: 0.3,
            kind: TideKind::Low,
        },
        TideExtremum {
            time: midnight() + Duration::hours(14),
            height: 2.1,
            kind: TideKind::High,
        },
    ];
    let result = compute_series(&extrema, midnight() + Duration::hours(11), 400, 300);

    assert_relative_eq!(result.current_height.unwrap(), 1.2, epsilon = 1e-9);
    assert_eq!(result.current_height_label, "1.20 m");
}

#[test]
fn a_full_day_brackets_each_interval() {
    let at = |h: i64| midnight() + Duration::hours(h);
    let extrema = [
        TideExtremum { time: at(2), height: 2.0, kind: TideKind::High },
        TideExtremum { time: at(8), height: 0.2, kind: TideKind::Low },
        TideExtremum { time: at(14), height: 2.2, kind: TideKind::High },
        TideExtremum { time: at(20), height: 0.4, kind: TideKind::Low },
    ];

    // halfway through each interval the height is the pair's mean
    for (i, expected) in [1.1, 1.2, 1.3].into_iter().enumerate() {
        let now = at(5 + 6 * i as i64);
        let result = compute_series(&extrema, now, 400, 300);
        assert_relative_eq!(result.current_height.unwrap(), expected, epsilon = 1e-9);
    }

    // a quarter into the falling first interval the water is still high
    let early = compute_series(&extrema, at(2) + Duration::minutes(90), 400, 300);
    assert!(early.current_height.unwrap() > 1.1);
}

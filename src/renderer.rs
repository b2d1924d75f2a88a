//! # Tide Chart Rendering
//!
//! Two consumers of [`TideSeriesResult`]: an ASCII chart for terminals and a
//! renderer for any `embedded-graphics` draw target (e-ink panels, simulators,
//! test mocks). Both take plot coordinates as computed by the engine and do no
//! tide math of their own.

use crate::query::QueryState;
use crate::TideSeriesResult;
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Circle, Polyline, PrimitiveStyle},
    text::{Baseline, Text},
};

/// Terminal chart height in characters.
pub const ROWS: usize = 20;
/// Terminal chart width in characters.
pub const COLUMNS: usize = 64;

/// One line describing what the consumer should show.
///
/// Loading, failure and "no curve" are reported distinctly; otherwise the
/// current height label is returned.
pub fn status_line(state: &QueryState, result: &TideSeriesResult) -> String {
    if state.loading {
        "loading tide data...".to_string()
    } else if let Some(err) = &state.error {
        format!("⚠ tide data unavailable: {err}")
    } else if result.is_empty() {
        "no tide curve for this time".to_string()
    } else {
        format!("Now: {}", result.current_height_label)
    }
}

/// Scale a plot coordinate onto `cells` character cells.
fn to_cell(coord: i32, extent: u32, cells: usize) -> usize {
    let span = extent.saturating_sub(1).max(1) as f64;
    let pos = (coord.max(0) as f64 / span * (cells - 1) as f64).round() as usize;
    pos.min(cells - 1)
}

/// Render the curve onto a character grid, marking "now" with `X`.
pub fn render_ascii(result: &TideSeriesResult, canvas_width: u32, canvas_height: u32) -> String {
    let mut grid = vec![vec![' '; COLUMNS]; ROWS];

    for sample in &result.samples {
        let row = to_cell(sample.y, canvas_height, ROWS);
        let column = to_cell(sample.x, canvas_width, COLUMNS);
        grid[row][column] = '•';
    }

    if !result.is_empty() {
        let now = result.current_position;
        grid[to_cell(now.y, canvas_height, ROWS)][to_cell(now.x, canvas_width, COLUMNS)] = 'X';
    }

    let mut out = String::with_capacity(ROWS * (COLUMNS + 3) + COLUMNS + 2);
    for row in grid {
        out.push('│');
        out.extend(row);
        out.push('\n');
    }
    out.push('└');
    out.push_str(&"─".repeat(COLUMNS));
    out.push('\n');
    out
}

/// Print the ASCII chart and status line to stdout.
pub fn draw_ascii(
    title: &str,
    state: &QueryState,
    result: &TideSeriesResult,
    canvas_width: u32,
    canvas_height: u32,
) {
    println!("{title}");
    println!("{}", status_line(state, result));
    println!();
    print!("{}", render_ascii(result, canvas_width, canvas_height));
}

/// Draw the curve, the "now" marker and the height label onto `display`.
///
/// Plot coordinates map one-to-one onto display pixels. An empty result draws
/// nothing.
pub fn draw_chart<D>(result: &TideSeriesResult, display: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    if result.is_empty() {
        return Ok(());
    }

    let points: Vec<Point> = result
        .samples
        .iter()
        .map(|s| Point::new(s.x, s.y))
        .collect();
    Polyline::new(&points)
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(display)?;

    let now = result.current_position;
    Circle::with_center(Point::new(now.x, now.y), 5)
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(display)?;

    let text_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    Text::with_baseline(
        &result.current_height_label,
        Point::new(2, 0),
        text_style,
        Baseline::Top,
    )
    .draw(display)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extremum_store::FetchError;
    use crate::interpolation::compute_series;
    use crate::{TideExtremum, TideKind};
    use chrono::{TimeZone, Utc};
    use embedded_graphics::mock_display::MockDisplay;

    fn rising() -> Vec<TideExtremum> {
        vec![
            TideExtremum {
                time: Utc.with_ymd_and_hms(2024, 6, 16, 8, 0, 0).unwrap(),
                height: 0.3,
                kind: TideKind::Low,
            },
            TideExtremum {
                time: Utc.with_ymd_and_hms(2024, 6, 16, 14, 0, 0).unwrap(),
                height: 2.1,
                kind: TideKind::High,
            },
        ]
    }

    #[test]
    fn test_status_lines_are_distinct() {
        let now = Utc.with_ymd_and_hms(2024, 6, 16, 11, 0, 0).unwrap();
        let result = compute_series(&rising(), now, 400, 300);
        let empty = TideSeriesResult::empty(300);

        let loading = QueryState {
            loading: true,
            ..QueryState::default()
        };
        let failed = QueryState {
            error: Some(FetchError::Network("offline".to_string())),
            ..QueryState::default()
        };
        let idle = QueryState::default();

        assert_eq!(status_line(&loading, &result), "loading tide data...");
        assert!(status_line(&failed, &result).contains("offline"));
        assert_eq!(status_line(&idle, &empty), "no tide curve for this time");
        assert_eq!(status_line(&idle, &result), "Now: 1.20 m");
    }

    #[test]
    fn test_ascii_rendering_marks_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 16, 11, 0, 0).unwrap();
        let result = compute_series(&rising(), now, 400, 300);
        let chart = render_ascii(&result, 400, 300);

        assert_eq!(chart.lines().count(), ROWS + 1);
        assert_eq!(chart.matches('X').count(), 1);
        assert!(chart.contains('•'));
    }

    #[test]
    fn test_ascii_rendering_of_empty_result() {
        let chart = render_ascii(&TideSeriesResult::empty(300), 400, 300);
        assert!(!chart.contains('X'));
        assert!(!chart.contains('•'));
    }

    #[test]
    fn test_chart_drawing() {
        let now = Utc.with_ymd_and_hms(2024, 6, 16, 11, 0, 0).unwrap();
        let result = compute_series(&rising(), now, 64, 64);
        let mut display = MockDisplay::<BinaryColor>::new();
        display.set_allow_overdraw(true);
        display.set_allow_out_of_bounds_drawing(true);

        draw_chart(&result, &mut display).unwrap();

        let marker = result.current_position;
        assert_eq!(
            display.get_pixel(Point::new(marker.x, marker.y)),
            Some(BinaryColor::On)
        );
        assert!(display.affected_area().size.width > 0);
    }

    #[test]
    fn test_empty_chart_draws_nothing() {
        let mut display = MockDisplay::<BinaryColor>::new();
        draw_chart(&TideSeriesResult::empty(64), &mut display).unwrap();
        assert_eq!(display.affected_area().size.width, 0);
    }
}

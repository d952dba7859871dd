//! Text line-chart rendering
//!
//! Draws one or more numeric series as a box-drawing line chart with a
//! y-axis, title, axis labels, and a per-series legend. Output is plain
//! `String` lines so callers decide when (and whether) to print.

use colored::{Color, Colorize};

/// Layout and styling for [`render`]
#[derive(Debug, Clone)]
pub struct ChartConfig {
    /// Plot area width in columns (points are downsampled to fit)
    pub width: usize,
    /// Plot area height in rows
    pub height: usize,
    /// Title printed above the chart
    pub title: String,
    /// Label printed above the y-axis
    pub y_label: String,
    /// Label printed below the x-axis
    pub x_label: String,
    /// Per-series line colors, cycled when there are more series
    pub colors: Vec<Color>,
    /// Per-series legend labels
    pub labels: Vec<String>,
}

/// Default palette, matched to the series order of a cycle plot
pub const PALETTE: [Color; 6] = [
    Color::BrightGreen,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::White,
];

/// Render `series` as a multi-line chart string.
///
/// Returns an empty string when no series has any points.
pub fn render(series: &[Vec<f64>], cfg: &ChartConfig) -> String {
    let width = cfg.width.max(2);
    let height = cfg.height.max(2);

    let sampled: Vec<Vec<f64>> = series
        .iter()
        .map(|points| downsample(points, width))
        .collect();
    if sampled.iter().all(Vec::is_empty) {
        return String::new();
    }

    let (min, max) = value_range(&sampled);
    let span = (max - min).max(f64::EPSILON);

    // Grid of already-colored cells; last writer wins on overlap.
    let cols = sampled.iter().map(Vec::len).max().unwrap_or(0);
    let mut grid = vec![vec![String::new(); cols]; height + 1];

    for (series_idx, points) in sampled.iter().enumerate() {
        let color = cfg.colors[series_idx % cfg.colors.len().max(1)];
        plot_series(points, &mut grid, height, min, span, color);
    }

    let mut out = String::new();
    out.push_str(&format!("{}\n", cfg.title.bold()));
    out.push_str(&format!("{}\n", cfg.y_label));

    for (row_idx, row) in grid.iter().enumerate() {
        let value = max - span * row_idx as f64 / height as f64;
        out.push_str(&format!("{:>9.2} ┤", value));
        for cell in row {
            if cell.is_empty() {
                out.push(' ');
            } else {
                out.push_str(cell);
            }
        }
        out.push('\n');
    }

    out.push_str(&format!("{:>10}{}\n", "", "─".repeat(cols.max(1))));
    out.push_str(&format!("{:>10}{}\n", "", cfg.x_label));

    for (idx, label) in cfg.labels.iter().enumerate() {
        let color = cfg.colors[idx % cfg.colors.len().max(1)];
        out.push_str(&format!("{}\n", label.color(color)));
    }

    out
}

/// Reduce a series to at most `width` points, keeping endpoints
fn downsample(points: &[f64], width: usize) -> Vec<f64> {
    if points.len() <= width {
        return points.to_vec();
    }
    (0..width)
        .map(|i| {
            let idx = i * (points.len() - 1) / (width - 1);
            points[idx]
        })
        .collect()
}

fn value_range(series: &[Vec<f64>]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for points in series {
        for &v in points {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if !min.is_finite() || !max.is_finite() {
        (0.0, 1.0)
    } else if (max - min).abs() < f64::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}

fn plot_series(
    points: &[f64],
    grid: &mut [Vec<String>],
    height: usize,
    min: f64,
    span: f64,
    color: Color,
) {
    let row_of = |value: f64| -> usize {
        let normalized = (value - min) / span;
        ((1.0 - normalized) * height as f64).round() as usize
    };
    let put = |grid: &mut [Vec<String>], row: usize, col: usize, glyph: &str| {
        if let Some(cell) = grid.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = glyph.color(color).to_string();
        }
    };

    for (col, window) in points.windows(2).enumerate() {
        let from = row_of(window[0]);
        let to = row_of(window[1]);

        if from == to {
            put(grid, to, col + 1, "─");
        } else if from > to {
            // Rising edge (screen rows grow downward)
            put(grid, from, col + 1, "╰");
            put(grid, to, col + 1, "╭");
            for row in (to + 1)..from {
                put(grid, row, col + 1, "│");
            }
        } else {
            put(grid, from, col + 1, "╮");
            put(grid, to, col + 1, "╯");
            for row in (from + 1)..to {
                put(grid, row, col + 1, "│");
            }
        }
    }

    if let Some(&first) = points.first() {
        put(grid, row_of(first), 0, "─");
    }
}

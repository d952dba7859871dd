//! Per-task cycle plot: aligner plus live chart
//!
//! Every cycle the plot yields to let the provider deliver, snapshots the
//! task's entry buffer, folds the newest `function` timings into per-name
//! series of equal length, and re-renders the chart.

pub mod chart;

use crate::entry::{EntryBuffer, EntryKind};
use crate::task::WRAPPER_NAME;
use chart::{ChartConfig, PALETTE};

/// Fallback terminal size when no tty is attached
const FALLBACK_SIZE: (u16, u16) = (200, 25);

/// One aligned sample of a named function series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotPoint {
    /// Milliseconds since the provider's epoch
    pub start_time: f64,
    /// Duration in milliseconds; zero for pad points
    pub duration: f64,
}

impl PlotPoint {
    fn pad(start_time: f64) -> Self {
        Self {
            start_time,
            duration: 0.0,
        }
    }
}

/// A named, cycle-aligned series of durations
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Function name (the task's own name for the wrapper series)
    pub name: String,
    /// One point per cycle seen since the series appeared
    pub points: Vec<PlotPoint>,
}

impl Series {
    fn min_start(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.start_time)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Live chart of a task's per-cycle durations.
///
/// Series are discovered from the entry feed as cycles run; all series are
/// kept at equal length so every x position means the same cycle.
#[derive(Debug)]
pub struct CyclePlot {
    taskname: String,
    series: Vec<Series>,
    chart: Option<String>,
    quiet: bool,
}

impl CyclePlot {
    /// Create an empty plot for the named task
    pub fn new(taskname: &str) -> Self {
        Self {
            taskname: taskname.to_string(),
            series: Vec::new(),
            chart: None,
            quiet: false,
        }
    }

    /// Suppress terminal drawing (the chart string is still produced)
    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    /// The aligned series, in display order
    pub fn series(&self) -> Vec<&Series> {
        self.display_order()
    }

    /// The most recent rendered chart, if any cycle produced data
    pub fn get(&self) -> Option<&str> {
        self.chart.as_deref()
    }

    /// Fold the buffer's newest function timings into the series and
    /// re-render. Yields once first so in-flight deliveries land.
    pub async fn update(&mut self, buffer: &EntryBuffer) {
        tokio::task::yield_now().await;

        let entries = buffer.flattened();
        self.apply(&latest_function_points(&entries));

        if let Some(rendered) = self.render() {
            self.chart = Some(rendered);
        }
    }

    /// Print the current chart, clearing the screen first
    pub fn draw(&self) {
        if self.quiet {
            return;
        }
        if let Some(chart) = &self.chart {
            print!("\x1b[2J\x1b[H{chart}");
        }
    }

    fn apply(&mut self, latest: &[(String, PlotPoint)]) {
        for (name, point) in latest {
            match self.series.iter_mut().find(|s| s.name == *name) {
                Some(series) => {
                    // Same timestamp means no new sample this cycle.
                    let repeated = series
                        .points
                        .last()
                        .is_some_and(|last| last.start_time == point.start_time);
                    if repeated {
                        let start = series.points.last().map_or(0.0, |p| p.start_time);
                        series.points.push(PlotPoint::pad(start));
                    } else {
                        series.points.push(*point);
                    }
                }
                None => self.series.push(Series {
                    name: name.clone(),
                    points: vec![*point],
                }),
            }
        }

        // Left-pad late series so every series spans the same cycles.
        let max_len = self.series.iter().map(|s| s.points.len()).max().unwrap_or(0);
        for series in &mut self.series {
            let missing = max_len - series.points.len();
            if missing > 0 {
                let start = series.min_start();
                let pads = vec![PlotPoint::pad(start); missing];
                series.points.splice(0..0, pads);
            }
        }
    }

    fn display_order(&self) -> Vec<&Series> {
        let mut ordered: Vec<&Series> = Vec::with_capacity(self.series.len());
        ordered.extend(self.series.iter().filter(|s| s.name == self.taskname));
        ordered.extend(self.series.iter().filter(|s| s.name != self.taskname));
        ordered
    }

    fn render(&self) -> Option<String> {
        let ordered = self.display_order();
        let total_points: usize = ordered.iter().map(|s| s.points.len()).sum();
        if total_points == 0 {
            return None;
        }

        let (cols, rows) = crossterm::terminal::size().unwrap_or(FALLBACK_SIZE);
        let data: Vec<Vec<f64>> = ordered
            .iter()
            .map(|s| s.points.iter().map(|p| p.duration).collect())
            .collect();
        let labels = ordered
            .iter()
            .enumerate()
            .map(|(idx, s)| {
                if idx == 0 {
                    "- main task".to_string()
                } else {
                    format!("- fn:{}", s.name)
                }
            })
            .collect();

        let cfg = ChartConfig {
            width: (cols as usize / 2).max(16),
            height: ((rows as f64 / 2.5) as usize).max(4),
            title: format!("task: \"{}\"", self.taskname),
            y_label: "durations (ms)".to_string(),
            x_label: "cycles".to_string(),
            colors: PALETTE.to_vec(),
            labels,
        };
        Some(chart::render(&data, &cfg))
    }
}

/// The newest `function` sample per name, in order of first appearance.
///
/// Wrapper entries (recorded under the sentinel name) are attributed to the
/// task name carried in their detail payload.
fn latest_function_points(entries: &[crate::entry::Entry]) -> Vec<(String, PlotPoint)> {
    let mut names: Vec<String> = Vec::new();
    let mut latest: std::collections::HashMap<String, PlotPoint> =
        std::collections::HashMap::new();

    for entry in entries {
        if entry.entry_type != EntryKind::Function {
            continue;
        }
        let name = if entry.name == WRAPPER_NAME {
            match entry.cycle_detail() {
                Some((_, taskname)) => taskname.to_string(),
                None => continue,
            }
        } else {
            entry.name.clone()
        };

        if !latest.contains_key(&name) {
            names.push(name.clone());
        }
        latest.insert(
            name,
            PlotPoint {
                start_time: entry.start_time,
                duration: entry.duration,
            },
        );
    }

    names
        .into_iter()
        .map(|name| {
            let point = latest[&name];
            (name, point)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Entry, EntryDetail};

    fn wrapper(taskname: &str, cycle: u64, start: f64, duration: f64) -> Entry {
        Entry::new(WRAPPER_NAME, EntryKind::Function, start, duration).with_detail(
            EntryDetail::Cycle {
                cycle,
                taskname: taskname.to_string(),
            },
        )
    }

    fn func(name: &str, start: f64, duration: f64) -> Entry {
        Entry::new(name, EntryKind::Function, start, duration)
    }

    async fn plot_with(taskname: &str, groups: Vec<Vec<Entry>>) -> CyclePlot {
        let buffer = EntryBuffer::new();
        let mut plot = CyclePlot::new(taskname);
        plot.set_quiet(true);
        for group in groups {
            buffer.push_group(group);
            plot.update(&buffer).await;
        }
        plot
    }

    #[tokio::test]
    async fn test_wrapper_entries_are_renamed_to_taskname() {
        let plot = plot_with("alpha", vec![vec![wrapper("alpha", 1, 10.0, 2.0)]]).await;

        let series = plot.series();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, "alpha");
        assert_eq!(series[0].points, vec![PlotPoint { start_time: 10.0, duration: 2.0 }]);
    }

    #[tokio::test]
    async fn test_all_series_have_equal_length() {
        let plot = plot_with(
            "alpha",
            vec![
                vec![wrapper("alpha", 1, 10.0, 2.0)],
                vec![wrapper("alpha", 2, 20.0, 3.0), func("inner", 21.0, 1.0)],
                vec![wrapper("alpha", 3, 30.0, 2.5), func("inner", 31.0, 1.5)],
            ],
        )
        .await;

        let series = plot.series();
        assert_eq!(series.len(), 2);
        assert!(series.iter().all(|s| s.points.len() == 3));
    }

    #[tokio::test]
    async fn test_late_series_is_left_padded_with_its_min_start() {
        let plot = plot_with(
            "alpha",
            vec![
                vec![wrapper("alpha", 1, 10.0, 2.0)],
                vec![wrapper("alpha", 2, 20.0, 3.0), func("inner", 21.0, 1.0)],
            ],
        )
        .await;

        let series = plot.series();
        let inner = series.iter().find(|s| s.name == "inner").unwrap();
        assert_eq!(inner.points.len(), 2);
        assert_eq!(inner.points[0], PlotPoint { start_time: 21.0, duration: 0.0 });
        assert_eq!(inner.points[1], PlotPoint { start_time: 21.0, duration: 1.0 });
    }

    #[tokio::test]
    async fn test_stale_sample_becomes_pad_point() {
        let plot = plot_with(
            "alpha",
            vec![
                vec![wrapper("alpha", 1, 10.0, 2.0), func("inner", 11.0, 1.0)],
                // inner produced nothing this cycle; its latest is unchanged
                vec![wrapper("alpha", 2, 20.0, 3.0)],
            ],
        )
        .await;

        let series = plot.series();
        let inner = series.iter().find(|s| s.name == "inner").unwrap();
        assert_eq!(inner.points[1].duration, 0.0);
        assert_eq!(inner.points[1].start_time, 11.0);
    }

    #[tokio::test]
    async fn test_task_series_is_displayed_first() {
        let plot = plot_with(
            "alpha",
            vec![vec![func("inner", 5.0, 1.0), wrapper("alpha", 1, 10.0, 2.0)]],
        )
        .await;

        let series = plot.series();
        assert_eq!(series[0].name, "alpha");
        assert_eq!(series[1].name, "inner");
    }

    #[tokio::test]
    async fn test_chart_survives_empty_update() {
        let buffer = EntryBuffer::new();
        let mut plot = CyclePlot::new("alpha");
        plot.set_quiet(true);

        buffer.push_group(vec![wrapper("alpha", 1, 10.0, 2.0)]);
        plot.update(&buffer).await;
        let first = plot.get().map(str::to_string);
        assert!(first.is_some());

        // A later update over the same data re-renders, never clears.
        plot.update(&buffer).await;
        assert!(plot.get().is_some());
    }

    #[tokio::test]
    async fn test_empty_update_appends_one_pad_per_series() {
        let buffer = EntryBuffer::new();
        let mut plot = CyclePlot::new("alpha");
        plot.set_quiet(true);

        buffer.push_group(vec![
            wrapper("alpha", 1, 10.0, 2.0),
            func("inner", 11.0, 1.5),
        ]);
        plot.update(&buffer).await;
        assert!(plot.series().iter().all(|s| s.points.len() == 1));

        // Each no-new-data update grows every series by exactly one
        // zero-duration pad point.
        for expected_len in [2, 3] {
            plot.update(&buffer).await;
            for series in plot.series() {
                assert_eq!(series.points.len(), expected_len);
                let pad = series.points.last().unwrap();
                assert_eq!(pad.duration, 0.0);
            }
        }
    }

    #[tokio::test]
    async fn test_non_function_entries_are_ignored() {
        let plot = plot_with(
            "alpha",
            vec![vec![
                wrapper("alpha", 1, 10.0, 2.0),
                Entry::new("m", EntryKind::Mark, 11.0, 0.0),
                Entry::new("gc", EntryKind::Gc, 12.0, 0.5),
            ]],
        )
        .await;

        assert_eq!(plot.series().len(), 1);
    }
}

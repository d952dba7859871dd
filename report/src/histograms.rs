//! Aggregated histogram report
//!
//! Renders percentile tables for task durations, mark values, measures,
//! captured entry kinds, and run vitals. All accessors on the bench are
//! end-gated, so rendering before the run has ended returns an error.

use crate::util::{section, to_ms, to_unit, Accent, Table};
use cyclebench_core::{Bench, DurationHistogram, EntryDetail, EntryKind, HistogramSnapshot, Result};
use std::collections::BTreeMap;

const COLUMNS: [&str; 9] = [
    "name", "count", "min", "max", "mean", "50_%", "75_%", "100_%", "deviation",
];

/// Render the histogram report for an ended run
pub fn render(bench: &Bench) -> Result<String> {
    let mut out = String::new();

    out.push_str(&section("tasks"));
    out.push_str(&tasks_table(bench)?.render());

    let entries: Vec<_> = bench
        .to_entries()?
        .iter()
        .flat_map(|t| t.entries.iter())
        .collect();

    let marks = marks_table(&entries);
    if !marks.is_empty() {
        out.push_str(&section("entry"));
        out.push_str(&marks.render());
    }

    let measures = measures_table(&entries);
    if !measures.is_empty() {
        out.push_str(&section("measures"));
        out.push_str(&measures.render());
    }

    out.push_str(&section("entry types"));
    out.push_str(&kinds_table(&entries).render());

    out.push_str(&section("vitals"));
    let mut vitals = Table::new(COLUMNS.to_vec());
    vitals.push_row(snapshot_row("loop latency", &bench.loop_snapshot()?, to_ms));
    out.push_str(&vitals.render());

    Ok(out)
}

/// Render and print the histogram report
pub fn print(bench: &Bench) -> Result<()> {
    println!("{}", render(bench)?);
    Ok(())
}

fn tasks_table(bench: &Bench) -> Result<Table> {
    let mut histograms = bench.to_histograms()?;
    histograms.sort_by(|a, b| {
        b.1.mean
            .partial_cmp(&a.1.mean)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut table = Table::new(COLUMNS.to_vec());
    for (name, snapshot) in &histograms {
        table.push_row(snapshot_row(name, snapshot, to_ms));
    }
    Ok(table)
}

fn marks_table(entries: &[&cyclebench_core::Entry]) -> Table {
    // name -> (histogram over values, display unit)
    let mut groups: BTreeMap<&str, (DurationHistogram, Option<String>)> = BTreeMap::new();
    for entry in entries {
        if entry.entry_type != EntryKind::Mark {
            continue;
        }
        if let Some(EntryDetail::Mark { value, unit }) = &entry.detail {
            let (histogram, display_unit) = groups.entry(entry.name.as_str()).or_default();
            histogram.record_value(*value);
            if display_unit.is_none() {
                display_unit.clone_from(unit);
            }
        }
    }

    let mut table = Table::new(COLUMNS.to_vec());
    for (name, (histogram, unit)) in &groups {
        let unit = unit.as_deref();
        table.push_row(snapshot_row(name, &histogram.snapshot(), |v| {
            to_unit(v, unit)
        }));
    }
    table
}

fn measures_table(entries: &[&cyclebench_core::Entry]) -> Table {
    let mut groups: BTreeMap<&str, DurationHistogram> = BTreeMap::new();
    for entry in entries {
        if entry.entry_type == EntryKind::Measure {
            groups
                .entry(entry.name.as_str())
                .or_default()
                .record_value(entry.duration);
        }
    }

    let mut table = Table::new(COLUMNS.to_vec());
    for (name, histogram) in &groups {
        table.push_row(snapshot_row(name, &histogram.snapshot(), to_ms));
    }
    table
}

fn kinds_table(entries: &[&cyclebench_core::Entry]) -> Table {
    let mut table = Table::new(COLUMNS.to_vec());
    for (kind, label) in [
        (EntryKind::Gc, "gc"),
        (EntryKind::Dns, "dns"),
        (EntryKind::Net, "net"),
    ] {
        let mut histogram = DurationHistogram::new();
        for entry in entries {
            if entry.entry_type == kind && entry.duration > 0.0 {
                histogram.record_value(entry.duration);
            }
        }
        // Rows are kept even when empty so the section shape is stable.
        table.push_row(snapshot_row(label, &histogram.snapshot(), to_ms));
    }
    table
}

fn snapshot_row(
    name: &str,
    snapshot: &HistogramSnapshot,
    fmt: impl Fn(f64) -> String,
) -> Vec<(String, Accent)> {
    vec![
        (name.to_string(), Accent::None),
        (snapshot.count.to_string(), Accent::None),
        (fmt(snapshot.min), Accent::None),
        (fmt(snapshot.max), Accent::Yellow),
        (fmt(snapshot.mean), Accent::Green),
        (fmt(snapshot.p50), Accent::None),
        (fmt(snapshot.p75), Accent::None),
        (fmt(snapshot.p100), Accent::None),
        (fmt(snapshot.stddev), Accent::None),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyclebench_core::{Error, TaskSpec};
    use std::time::Duration;

    async fn ended_bench() -> Bench {
        let spec = TaskSpec::new("demo", 3, |ctx| async move {
            ctx.mark_value("heap", 42.5, Some("MB"));
            ctx.mark("begin");
            tokio::time::sleep(Duration::from_millis(3)).await;
            ctx.mark("finish");
            ctx.measure("span", "begin", "finish")?;
            Ok(())
        });
        let mut bench = Bench::new();
        bench.set_quiet_plots(true);
        bench.run(vec![spec]).await.unwrap();
        bench
    }

    #[tokio::test]
    async fn test_render_has_all_sections() {
        colored::control::set_override(false);
        let bench = ended_bench().await;
        let report = render(&bench).unwrap();

        for title in ["tasks", "entry", "measures", "entry types", "vitals"] {
            assert!(report.contains(title), "missing section {title:?}");
        }
        assert!(report.contains("demo"));
        assert!(report.contains("heap"));
        assert!(report.contains("42.5 MB"));
        assert!(report.contains("span"));
        assert!(report.contains("loop latency"));
    }

    #[tokio::test]
    async fn test_empty_kinds_render_as_na() {
        colored::control::set_override(false);
        let bench = ended_bench().await;
        let report = render(&bench).unwrap();

        let gc_row = report
            .lines()
            .find(|l| l.trim_start().starts_with("gc"))
            .expect("gc row");
        assert!(gc_row.contains("n/a"));
    }

    #[tokio::test]
    async fn test_render_requires_ended_run() {
        let bench = Bench::new();
        assert!(matches!(render(&bench), Err(Error::RunNotEnded)));
    }
}

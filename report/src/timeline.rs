//! Chronological timeline report
//!
//! Renders every captured entry as one row, in capture order, grouped
//! under a task header that opens at the task's first cycle.

use crate::util::to_ms;
use colored::Colorize;
use cyclebench_core::{Bench, Entry, EntryDetail, EntryKind, Result, WRAPPER_NAME};

/// Render the timeline report for an ended run
pub fn render(bench: &Bench) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n", "timeline".cyan().bold()));

    if let Some(started) = bench.started_at() {
        out.push_str(&format!("Startup: {}\n", started.to_rfc3339()));
    }

    for task in bench.to_entries()? {
        for entry in &task.entries {
            out.push_str(&row(entry));
        }
    }

    Ok(out)
}

/// Render and print the timeline report
pub fn print(bench: &Bench) -> Result<()> {
    println!("{}", render(bench)?);
    Ok(())
}

fn row(entry: &Entry) -> String {
    let stamp = format!("[{:>10.2}]", entry.start_time);

    match entry.entry_type {
        EntryKind::Function => match entry.cycle_detail() {
            Some((cycle, taskname)) if entry.name == WRAPPER_NAME => {
                let mut out = String::new();
                if cycle == 1 {
                    out.push_str(&format!("{}\n", format!("Task: {taskname}").magenta().bold()));
                }
                out.push_str(&format!(
                    "{stamp}  cycle {:<12} {}\n",
                    cycle,
                    to_ms(entry.duration).green()
                ));
                out
            }
            _ => format!(
                "{stamp}  fn    {:<12} {}\n",
                entry.name,
                to_ms(entry.duration)
            ),
        },
        EntryKind::Mark => {
            let value = match &entry.detail {
                Some(EntryDetail::Mark { value, unit }) => {
                    format!(" {}", crate::util::to_unit(*value, unit.as_deref()))
                }
                _ => String::new(),
            };
            format!("{stamp}  mark  {}{}\n", entry.name, value)
        }
        EntryKind::Measure => format!(
            "{stamp}  measure {:<10} {}\n",
            entry.name,
            to_ms(entry.duration)
        ),
        kind => {
            let detail = match &entry.detail {
                Some(EntryDetail::Raw(value)) => format!(" {value}"),
                _ => String::new(),
            };
            format!(
                "{stamp}  {:<5} {:<12} {}{detail}\n",
                kind_label(kind),
                entry.name,
                to_ms(entry.duration)
            )
        }
    }
}

fn kind_label(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Function => "fn",
        EntryKind::Gc => "gc",
        EntryKind::Dns => "dns",
        EntryKind::Net => "net",
        EntryKind::Mark => "mark",
        EntryKind::Measure => "measure",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyclebench_core::{Error, TaskSpec};

    #[tokio::test]
    async fn test_render_groups_cycles_under_task_header() {
        colored::control::set_override(false);
        let spec = TaskSpec::new("demo", 2, |ctx| async move {
            ctx.mark("tick");
            ctx.timed("inner", async {}).await;
            Ok(())
        });
        let mut bench = Bench::new();
        bench.set_quiet_plots(true);
        bench.run(vec![spec]).await.unwrap();

        let report = render(&bench).unwrap();
        assert!(report.contains("timeline"));
        assert!(report.contains("Startup:"));
        assert_eq!(report.matches("Task: demo").count(), 1);
        assert_eq!(report.matches("cycle").count(), 2);
        assert_eq!(report.matches("mark  tick").count(), 2);
        assert!(report.contains("fn    inner"));
    }

    #[tokio::test]
    async fn test_render_requires_ended_run() {
        let bench = Bench::new();
        assert!(matches!(render(&bench), Err(Error::RunNotEnded)));
    }
}

//! cyclebench - cycle-oriented micro-benchmark harness
//!
//! Runs a pair of demo tasks (one CPU-bound, one sleep-bound) under
//! instrumentation and prints the selected reports.

use anyhow::Result;
use clap::Parser;
use cyclebench_core::{Bench, TaskSpec};
use std::time::Duration;

mod cli;

use cli::ReportKind;

// The whole pipeline relies on cooperative yields making queued entry
// deliveries visible before the next read; that only holds when everything
// shares one scheduler thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let mut bench = Bench::new();
    bench.set_quiet_plots(args.quiet);
    bench.run(demo_tasks(args.cycles)).await?;

    if matches!(args.report, ReportKind::Plots | ReportKind::All) {
        for chart in bench.to_plots()? {
            println!("{chart}");
        }
    }
    if matches!(args.report, ReportKind::Histograms | ReportKind::All) {
        cyclebench_report::histograms::print(&bench)?;
    }
    if matches!(args.report, ReportKind::Timeline | ReportKind::All) {
        cyclebench_report::timeline::print(&bench)?;
    }

    Ok(())
}

fn demo_tasks(cycles: u64) -> Vec<TaskSpec> {
    let fibonacci = TaskSpec::new("fibonacci", cycles, |ctx| async move {
        // The inner call gets its own series on the task's chart.
        let n = 20 + (ctx.cycle % 5) as u32;
        let value = ctx.timed("fib", async move { fib(n) }).await;
        ctx.mark_value("fib result", value as f64, None);
        Ok(())
    });

    let io_wait = TaskSpec::new("io-wait", cycles, |ctx| async move {
        ctx.mark("sleep start");
        tokio::time::sleep(Duration::from_millis(2 + ctx.cycle % 3)).await;
        ctx.mark("sleep end");
        ctx.measure("sleep", "sleep start", "sleep end")?;
        Ok(())
    });

    vec![fibonacci, io_wait]
}

fn fib(n: u32) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fib(n - 1) + fib(n - 2),
    }
}

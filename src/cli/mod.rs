//! CLI argument parsing

use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "cyclebench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Cycles to run each demo task
    #[arg(short, long, default_value_t = 10)]
    pub cycles: u64,

    /// Suppress live charts while running
    #[arg(short, long)]
    pub quiet: bool,

    /// Which report to print once the run has ended
    #[arg(short, long, value_enum, default_value_t = ReportKind::All)]
    pub report: ReportKind,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    /// Final per-task cycle charts
    Plots,
    /// Histogram tables
    Histograms,
    /// Chronological entry timeline
    Timeline,
    /// Everything
    All,
}

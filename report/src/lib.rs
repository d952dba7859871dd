//! cyclebench-report: Table reports over ended benchmark runs
//!
//! This crate renders an ended [`Bench`](cyclebench_core::Bench) as
//! terminal-friendly text:
//!
//! - Histogram tables (tasks, marks, measures, entry kinds, vitals)
//! - A chronological timeline of every captured entry

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod histograms;
pub mod timeline;
mod util;

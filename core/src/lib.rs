//! cyclebench-core: Core types for cycle-oriented micro-benchmarking
//!
//! This crate provides the building blocks for running async tasks a fixed
//! number of cycles under instrumentation:
//!
//! - Run orchestration and lifecycle ([`Bench`])
//! - Task specifications and the per-cycle context
//! - Instrumentation capture (entries, marks, measures)
//! - Scheduler-lag sampling
//! - Cycle-aligned live charts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bench;
pub mod entry;
pub mod error;
pub mod instrument;
pub mod plot;
pub mod sampler;
pub mod stats;
pub mod task;

pub use bench::{Bench, RunState, TaskEntries};
pub use entry::{Entry, EntryBuffer, EntryDetail, EntryKind};
pub use error::{Error, Result};
pub use instrument::{timerify, Instrument, Recorder};
pub use plot::{CyclePlot, PlotPoint, Series};
pub use sampler::LoopMonitor;
pub use stats::{DurationHistogram, HistogramSnapshot};
pub use task::{Task, TaskContext, TaskSpec, WRAPPER_NAME};

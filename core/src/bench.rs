//! Run orchestration
//!
//! [`Bench`] owns the run lifecycle: it validates task specifications up
//! front, moves through `ready -> running -> ended` via a single transition
//! guard, executes tasks strictly sequentially on one cooperative
//! scheduler, and gates every result accessor on the run having ended.

use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::instrument::{Instrument, Recorder};
use crate::sampler::LoopMonitor;
use crate::stats::HistogramSnapshot;
use crate::task::{Task, TaskSpec};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Lifecycle state of a [`Bench`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Created, not yet run
    Ready,
    /// Tasks are executing
    Running,
    /// Run finished; results are readable
    Ended,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Ready => "ready",
            RunState::Running => "running",
            RunState::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// One task's captured entries, in run order
#[derive(Debug, Clone)]
pub struct TaskEntries {
    /// Task name
    pub name: String,
    /// Flattened entry list captured during the task's run
    pub entries: Vec<Entry>,
}

/// The benchmark orchestrator.
///
/// A `Bench` is single-shot: it runs one list of tasks and then only
/// serves results. Running again, or reading results early, is an error.
pub struct Bench {
    state: RunState,
    tasks: Vec<Task>,
    entries: Vec<TaskEntries>,
    instrument: Arc<dyn Instrument>,
    monitor: LoopMonitor,
    quiet_plots: bool,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl Bench {
    /// Create a bench backed by the default instrumentation provider
    pub fn new() -> Self {
        Self::with_instrument(Arc::new(Recorder::new()))
    }

    /// Create a bench backed by a caller-supplied provider
    pub fn with_instrument(instrument: Arc<dyn Instrument>) -> Self {
        Self {
            state: RunState::Ready,
            tasks: Vec::new(),
            entries: Vec::new(),
            instrument,
            monitor: LoopMonitor::default(),
            quiet_plots: false,
            started_at: None,
            ended_at: None,
        }
    }

    /// Suppress live chart drawing during the run
    pub fn set_quiet_plots(&mut self, quiet: bool) {
        self.quiet_plots = quiet;
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// When the run started
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the run ended
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Validate `specs` and execute them sequentially.
    ///
    /// Validation happens before any state changes, so a bad spec leaves
    /// the bench re-runnable. A failing task aborts the whole run.
    pub async fn run(&mut self, specs: Vec<TaskSpec>) -> Result<()> {
        validate_specs(&specs)?;
        match self.state {
            RunState::Ended => return Err(Error::AlreadyEnded),
            RunState::Running => return Err(Error::StillRunning),
            RunState::Ready => {}
        }

        self.tasks = specs
            .into_iter()
            .map(|spec| Task::new(spec, self.quiet_plots))
            .collect();

        self.transition(RunState::Running)?;
        self.started_at = Some(Utc::now());
        self.monitor.enable();
        tracing::info!(tasks = self.tasks.len(), "run started");

        for task in &mut self.tasks {
            let result = task.run(Arc::clone(&self.instrument)).await;
            match result {
                Ok(entries) => self.entries.push(TaskEntries {
                    name: task.name().to_string(),
                    entries,
                }),
                Err(err) => {
                    self.monitor.disable();
                    tracing::error!(task = task.name(), error = %err, "run aborted");
                    return Err(err);
                }
            }
        }

        self.monitor.disable();
        self.ended_at = Some(Utc::now());
        self.transition(RunState::Ended)?;
        tracing::info!("run ended");
        Ok(())
    }

    /// The executed tasks, available once the run has ended
    pub fn tasks(&self) -> Result<&[Task]> {
        self.ensure_ended()?;
        Ok(&self.tasks)
    }

    /// Per-task entry lists, in run order
    pub fn to_entries(&self) -> Result<&[TaskEntries]> {
        self.ensure_ended()?;
        Ok(&self.entries)
    }

    /// Per-task duration summaries, in run order
    pub fn to_histograms(&self) -> Result<Vec<(String, HistogramSnapshot)>> {
        self.ensure_ended()?;
        Ok(self
            .tasks
            .iter()
            .map(|t| (t.name().to_string(), t.histogram().snapshot()))
            .collect())
    }

    /// Final chart per task that produced plot data
    pub fn to_plots(&self) -> Result<Vec<String>> {
        self.ensure_ended()?;
        Ok(self
            .tasks
            .iter()
            .filter_map(|t| t.plot().get().map(str::to_string))
            .collect())
    }

    /// Scheduler-lag summary sampled across the whole run
    pub fn loop_snapshot(&self) -> Result<HistogramSnapshot> {
        self.ensure_ended()?;
        Ok(self.monitor.snapshot())
    }

    fn ensure_ended(&self) -> Result<()> {
        if self.state != RunState::Ended {
            return Err(Error::RunNotEnded);
        }
        Ok(())
    }

    fn transition(&mut self, target: RunState) -> Result<()> {
        let valid = matches!(
            (self.state, target),
            (RunState::Ready, RunState::Running) | (RunState::Running, RunState::Ended)
        );
        if !valid {
            return Err(Error::InvalidState(target.to_string()));
        }
        tracing::debug!(from = %self.state, to = %target, "state transition");
        self.state = target;
        Ok(())
    }
}

impl Default for Bench {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bench {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bench")
            .field("state", &self.state)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

fn validate_specs(specs: &[TaskSpec]) -> Result<()> {
    if specs.is_empty() {
        return Err(Error::Validation {
            index: 0,
            field: "tasks",
            reason: "expected at least one task".to_string(),
        });
    }
    for (index, spec) in specs.iter().enumerate() {
        spec.validate(index)?;
    }
    Ok(())
}

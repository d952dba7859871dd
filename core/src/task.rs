//! Task specifications, the per-cycle context, and the task executor

use crate::entry::{Entry, EntryDetail};
use crate::error::{Error, Result};
use crate::instrument::{timerify, Instrument};
use crate::plot::CyclePlot;
use crate::stats::DurationHistogram;
use crate::EntryBuffer;
use futures::future::BoxFuture;
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Sentinel name for the task's own wrapper invocation; the aligner renames
/// it to the task name carried in the entry's detail payload.
pub const WRAPPER_NAME: &str = "fn";

/// Future returned by a task's user function
pub type TaskFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A task's user function
pub type TaskFn = Arc<dyn Fn(TaskContext) -> TaskFuture + Send + Sync>;

/// User-supplied task specification.
///
/// Structural validation (`name`, `cycles`) happens before any run state is
/// mutated; the function itself is guaranteed callable by its type.
#[derive(Clone)]
pub struct TaskSpec {
    /// Task name, shown in charts and reports
    pub name: String,
    /// Number of repetitions to execute
    pub cycles: u64,
    run: TaskFn,
}

impl TaskSpec {
    /// Create a spec from an async function of the cycle context
    pub fn new<F, Fut>(name: impl Into<String>, cycles: u64, run: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            cycles,
            run: Arc::new(move |ctx| Box::pin(run(ctx))),
        }
    }

    pub(crate) fn validate(&self, index: usize) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Validation {
                index,
                field: "name",
                reason: "expected a string with length".to_string(),
            });
        }
        if self.cycles < 1 {
            return Err(Error::Validation {
                index,
                field: "cycles",
                reason: "expected a positive integer".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

/// Context handed to the user function on every cycle
#[derive(Clone)]
pub struct TaskContext {
    /// 1-based cycle index
    pub cycle: u64,
    /// Name of the owning task
    pub taskname: Arc<str>,
    instrument: Arc<dyn Instrument>,
}

impl TaskContext {
    /// Record a named mark
    pub fn mark(&self, name: &str) {
        self.instrument.mark(name, None);
    }

    /// Record a named mark carrying a value in an optional unit
    pub fn mark_value(&self, name: &str, value: f64, unit: Option<&str>) {
        self.instrument.mark(
            name,
            Some(EntryDetail::Mark {
                value,
                unit: unit.map(str::to_string),
            }),
        );
    }

    /// Record a measure spanning two previously recorded marks
    pub fn measure(&self, name: &str, start_mark: &str, end_mark: &str) -> Result<()> {
        self.instrument.measure(name, start_mark, end_mark)
    }

    /// Run a future under a named `function` timing entry
    pub async fn timed<T>(&self, name: &str, fut: impl Future<Output = T>) -> T {
        timerify(self.instrument.as_ref(), name, None, None, fut).await
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("cycle", &self.cycle)
            .field("taskname", &self.taskname)
            .finish_non_exhaustive()
    }
}

/// One task's full lifecycle state: identity, histogram, entry buffer, and
/// its live cycle plot. Owned by the orchestrator; never mutated after its
/// run completes.
pub struct Task {
    id: String,
    name: Arc<str>,
    cycles: u64,
    run_fn: TaskFn,
    histogram: DurationHistogram,
    buffer: EntryBuffer,
    plot: CyclePlot,
}

impl Task {
    pub(crate) fn new(spec: TaskSpec, quiet_plot: bool) -> Self {
        let id = format!("uid_{}", rand::thread_rng().gen_range(1_000_000..10_000_000));
        let mut plot = CyclePlot::new(&spec.name);
        plot.set_quiet(quiet_plot);

        Self {
            id,
            name: spec.name.into(),
            cycles: spec.cycles,
            run_fn: spec.run,
            histogram: DurationHistogram::new(),
            buffer: EntryBuffer::new(),
            plot,
        }
    }

    /// Generated task id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Task name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured cycle count
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Histogram over the wrapped function's own durations
    pub fn histogram(&self) -> &DurationHistogram {
        &self.histogram
    }

    /// The task's cycle plot
    pub fn plot(&self) -> &CyclePlot {
        &self.plot
    }

    /// Flattened snapshot of all captured entries
    pub fn entries(&self) -> Vec<Entry> {
        self.buffer.flattened()
    }

    /// Execute the task's function exactly `cycles` times, aligning and
    /// drawing the cycle plot after each cycle, and return the flattened
    /// entry list.
    pub(crate) async fn run(&mut self, instrument: Arc<dyn Instrument>) -> Result<Vec<Entry>> {
        instrument.subscribe(self.buffer.clone());
        tracing::debug!(task = %self.name, cycles = self.cycles, "task started");

        for cycle in 1..=self.cycles {
            let ctx = TaskContext {
                cycle,
                taskname: Arc::clone(&self.name),
                instrument: Arc::clone(&instrument),
            };
            let detail = EntryDetail::Cycle {
                cycle,
                taskname: self.name.to_string(),
            };

            let result = timerify(
                instrument.as_ref(),
                WRAPPER_NAME,
                Some(detail),
                Some(&mut self.histogram),
                (self.run_fn)(ctx),
            )
            .await;

            if let Err(source) = result {
                instrument.unsubscribe();
                return Err(Error::Task {
                    name: self.name.to_string(),
                    source,
                });
            }

            self.plot.update(&self.buffer).await;
            self.plot.draw();
        }

        // Drain-yield: give the provider's delivery task a final chance,
        // then collect whatever it still holds.
        tokio::task::yield_now().await;
        instrument.unsubscribe();
        self.buffer.push_group(instrument.take_records());

        tracing::debug!(
            task = %self.name,
            entries = self.buffer.len(),
            groups = self.buffer.group_count(),
            "task finished"
        );
        Ok(self.buffer.flattened())
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cycles", &self.cycles)
            .field("entries", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

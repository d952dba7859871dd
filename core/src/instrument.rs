//! The instrumentation provider port and its default implementation
//!
//! The executor talks to instrumentation through the [`Instrument`] trait
//! rather than an ambient global, so subscription ownership is explicit.
//! The feed is process-wide with a single subscriber slot; the orchestrator
//! guarantees non-overlapping use by running tasks strictly sequentially.

use crate::entry::{Entry, EntryBuffer, EntryDetail, EntryKind};
use crate::error::{Error, Result};
use crate::stats::DurationHistogram;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Port to the instrumentation provider.
///
/// Entries handed to [`record`](Instrument::record) are delivered to the
/// current subscriber asynchronously, as one batch per flush; a cooperative
/// yield is what gives the delivery a chance to run before the buffer is
/// read.
pub trait Instrument: Send + Sync + 'static {
    /// Milliseconds since the provider's epoch
    fn now_ms(&self) -> f64;

    /// Install `sink` as the single subscriber for all entry kinds
    fn subscribe(&self, sink: EntryBuffer);

    /// Remove the current subscriber
    fn unsubscribe(&self);

    /// Queue an entry for asynchronous batch delivery
    fn record(&self, entry: Entry);

    /// Drain entries recorded but not yet delivered
    fn take_records(&self) -> Vec<Entry>;

    /// Record a named mark, remembering its timestamp for later measures
    fn mark(&self, name: &str, detail: Option<EntryDetail>);

    /// Record a measure spanning two previously recorded marks
    fn measure(&self, name: &str, start_mark: &str, end_mark: &str) -> Result<()>;
}

/// Time a future and emit a `function` entry for it.
///
/// This is the provider's timing wrapper: the future's own duration is
/// recorded into the caller-supplied histogram (when given) and published
/// on the feed. The task executor uses it for the per-cycle wrapper entry;
/// `TaskContext::timed` uses it for user-named nested functions.
pub async fn timerify<T>(
    instrument: &dyn Instrument,
    name: &str,
    detail: Option<EntryDetail>,
    mut histogram: Option<&mut DurationHistogram>,
    fut: impl Future<Output = T>,
) -> T {
    let start_ms = instrument.now_ms();
    let started = Instant::now();
    let out = fut.await;
    let elapsed = started.elapsed();

    if let Some(histogram) = histogram.as_deref_mut() {
        histogram.record(elapsed);
    }

    let mut entry = Entry::new(
        name,
        EntryKind::Function,
        start_ms,
        elapsed.as_secs_f64() * 1_000.0,
    );
    if let Some(detail) = detail {
        entry = entry.with_detail(detail);
    }
    instrument.record(entry);

    out
}

#[derive(Debug, Default)]
struct RecorderState {
    pending: Mutex<Vec<Entry>>,
    sink: Mutex<Option<EntryBuffer>>,
    flush_scheduled: AtomicBool,
    marks: Mutex<HashMap<String, f64>>,
}

/// Default [`Instrument`] implementation.
///
/// Queues recorded entries and delivers them to the subscriber from a
/// separately scheduled flush task, so the "entries visible in buffer"
/// ordering matches a real asynchronous provider: nothing is observable
/// until the recording task yields.
#[derive(Debug)]
pub struct Recorder {
    epoch: Instant,
    state: Arc<RecorderState>,
}

impl Recorder {
    /// Create a recorder; its epoch is the creation instant
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            state: Arc::new(RecorderState::default()),
        }
    }

    fn schedule_flush(&self) {
        let state = Arc::clone(&self.state);
        if state.flush_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }

        tokio::spawn(async move {
            state.flush_scheduled.store(false, Ordering::SeqCst);

            // The pending lock is held across the sink check and the
            // delivery, so entries are either delivered to the sink or left
            // for take_records; an unsubscribe racing the flush can never
            // drop a batch.
            let mut pending = state.pending.lock().expect("recorder lock poisoned");
            if pending.is_empty() {
                return;
            }
            let sink = state.sink.lock().expect("recorder lock poisoned").clone();
            if let Some(sink) = sink {
                let batch: Vec<Entry> = pending.drain(..).collect();
                tracing::trace!(count = batch.len(), "delivering entry batch");
                sink.push_group(batch);
            }
        });
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Instrument for Recorder {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1_000.0
    }

    fn subscribe(&self, sink: EntryBuffer) {
        *self.state.sink.lock().expect("recorder lock poisoned") = Some(sink);
    }

    fn unsubscribe(&self) {
        *self.state.sink.lock().expect("recorder lock poisoned") = None;
    }

    fn record(&self, entry: Entry) {
        self.state
            .pending
            .lock()
            .expect("recorder lock poisoned")
            .push(entry);

        let subscribed = self
            .state
            .sink
            .lock()
            .expect("recorder lock poisoned")
            .is_some();
        if subscribed {
            self.schedule_flush();
        }
    }

    fn take_records(&self) -> Vec<Entry> {
        self.state
            .pending
            .lock()
            .expect("recorder lock poisoned")
            .drain(..)
            .collect()
    }

    fn mark(&self, name: &str, detail: Option<EntryDetail>) {
        let now = self.now_ms();
        self.state
            .marks
            .lock()
            .expect("recorder lock poisoned")
            .insert(name.to_string(), now);

        let mut entry = Entry::new(name, EntryKind::Mark, now, 0.0);
        if let Some(detail) = detail {
            entry = entry.with_detail(detail);
        }
        self.record(entry);
    }

    fn measure(&self, name: &str, start_mark: &str, end_mark: &str) -> Result<()> {
        let (start, end) = {
            let marks = self.state.marks.lock().expect("recorder lock poisoned");
            let start = *marks
                .get(start_mark)
                .ok_or_else(|| Error::UnknownMark(start_mark.to_string()))?;
            let end = *marks
                .get(end_mark)
                .ok_or_else(|| Error::UnknownMark(end_mark.to_string()))?;
            (start, end)
        };

        self.record(Entry::new(name, EntryKind::Measure, start, end - start));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::yield_now;

    #[tokio::test]
    async fn test_record_delivers_after_yield() {
        let recorder = Recorder::new();
        let buffer = EntryBuffer::new();
        recorder.subscribe(buffer.clone());

        recorder.record(Entry::new("a", EntryKind::Function, 1.0, 1.0));
        assert!(buffer.is_empty(), "delivery must be asynchronous");

        yield_now().await;
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.group_count(), 1);
    }

    #[tokio::test]
    async fn test_burst_arrives_as_one_group() {
        let recorder = Recorder::new();
        let buffer = EntryBuffer::new();
        recorder.subscribe(buffer.clone());

        recorder.record(Entry::new("a", EntryKind::Function, 1.0, 1.0));
        recorder.record(Entry::new("b", EntryKind::Mark, 2.0, 0.0));
        recorder.record(Entry::new("c", EntryKind::Measure, 3.0, 1.0));

        yield_now().await;
        assert_eq!(buffer.group_count(), 1);
        assert_eq!(buffer.len(), 3);
    }

    #[tokio::test]
    async fn test_take_records_drains_pending() {
        let recorder = Recorder::new();

        recorder.record(Entry::new("a", EntryKind::Function, 1.0, 1.0));
        recorder.record(Entry::new("b", EntryKind::Function, 2.0, 1.0));

        let drained = recorder.take_records();
        assert_eq!(drained.len(), 2);
        assert!(recorder.take_records().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let recorder = Recorder::new();
        let buffer = EntryBuffer::new();
        recorder.subscribe(buffer.clone());
        recorder.unsubscribe();

        recorder.record(Entry::new("a", EntryKind::Function, 1.0, 1.0));
        yield_now().await;

        assert!(buffer.is_empty());
        assert_eq!(recorder.take_records().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unsubscribe_then_drain_never_loses_entries() {
        // With the flush task on another worker, the entry must end up
        // either delivered to the buffer or drained by take_records.
        for _ in 0..500 {
            let recorder = Recorder::new();
            let buffer = EntryBuffer::new();
            recorder.subscribe(buffer.clone());

            recorder.record(Entry::new("a", EntryKind::Function, 1.0, 1.0));
            recorder.unsubscribe();
            let taken = recorder.take_records();

            assert_eq!(buffer.len() + taken.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_measure_between_marks() {
        let recorder = Recorder::new();

        recorder.mark("start", None);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        recorder.mark("end", None);
        recorder.measure("span", "start", "end").unwrap();

        let entries = recorder.take_records();
        let measure = entries
            .iter()
            .find(|e| e.entry_type == EntryKind::Measure)
            .expect("measure entry");

        assert_eq!(measure.name, "span");
        assert!(measure.duration >= 5.0, "duration {}", measure.duration);
        assert!(measure.duration < 1_000.0);
    }

    #[tokio::test]
    async fn test_measure_unknown_mark() {
        let recorder = Recorder::new();
        recorder.mark("start", None);

        let err = recorder.measure("span", "start", "missing").unwrap_err();
        assert!(matches!(err, Error::UnknownMark(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_timerify_records_histogram_and_entry() {
        let recorder = Recorder::new();
        let mut histogram = DurationHistogram::new();

        let value = timerify(
            &recorder,
            "work",
            None,
            Some(&mut histogram),
            async { 7_u64 },
        )
        .await;

        assert_eq!(value, 7);
        assert_eq!(histogram.count(), 1);

        let entries = recorder.take_records();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "work");
        assert_eq!(entries[0].entry_type, EntryKind::Function);
    }
}

//! Scheduler-responsiveness sampling
//!
//! A process-wide sampler that measures how late the cooperative scheduler
//! wakes a timer that asked to sleep for a fixed resolution. The oversleep
//! (lag) is what a stalled scheduler looks like from inside the process.

use crate::stats::{DurationHistogram, HistogramSnapshot};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Default sampling resolution
pub const DEFAULT_RESOLUTION: Duration = Duration::from_millis(10);

/// Samples scheduler lag into a histogram while enabled.
///
/// Enable/disable is owned by the orchestrator; the sampler task is
/// aborted on disable and on drop.
#[derive(Debug)]
pub struct LoopMonitor {
    resolution: Duration,
    histogram: Arc<Mutex<DurationHistogram>>,
    handle: Option<JoinHandle<()>>,
}

impl LoopMonitor {
    /// Create a disabled monitor with the given resolution
    pub fn new(resolution: Duration) -> Self {
        Self {
            resolution,
            histogram: Arc::new(Mutex::new(DurationHistogram::new())),
            handle: None,
        }
    }

    /// Start sampling. A no-op when already enabled.
    pub fn enable(&mut self) {
        if self.handle.is_some() {
            return;
        }

        let resolution = self.resolution;
        let histogram = Arc::clone(&self.histogram);
        self.handle = Some(tokio::spawn(async move {
            loop {
                let started = Instant::now();
                tokio::time::sleep(resolution).await;
                let lag = started.elapsed().saturating_sub(resolution);
                histogram
                    .lock()
                    .expect("loop monitor lock poisoned")
                    .record(lag);
            }
        }));
        tracing::debug!(resolution_ms = self.resolution.as_millis() as u64, "loop monitor enabled");
    }

    /// Stop sampling. Recorded samples are kept.
    pub fn disable(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("loop monitor disabled");
        }
    }

    /// True while the sampler task is running
    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    /// Summary of the lag samples recorded so far (milliseconds)
    pub fn snapshot(&self) -> HistogramSnapshot {
        self.histogram
            .lock()
            .expect("loop monitor lock poisoned")
            .snapshot()
    }
}

impl Default for LoopMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION)
    }
}

impl Drop for LoopMonitor {
    fn drop(&mut self) {
        self.disable();
    }
}

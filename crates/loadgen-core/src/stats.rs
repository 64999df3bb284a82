use std::fmt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Leaderboard operation a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Submit,
    Top,
    Rank,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Submit, Category::Top, Category::Rank];

    /// Section title used in the final report.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Submit => "Submit Score",
            Category::Top => "Get Top 10",
            Category::Rank => "Get Rank",
        }
    }

    fn index(&self) -> usize {
        match self {
            Category::Submit => 0,
            Category::Top => 1,
            Category::Rank => 2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Submit => "submit",
            Category::Top => "top",
            Category::Rank => "rank",
        };
        f.write_str(name)
    }
}

/// One finished attempt. `latency_ms` is `None` when no response arrived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub category: Category,
    pub latency_ms: Option<f64>,
    pub success: bool,
}

/// Counter view published while the run is in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total_requests: u64,
    pub errors: u64,
}

/// Per-category latency samples plus request and error counters.
#[derive(Debug, Clone, Default)]
pub struct MetricsSink {
    samples: [Vec<f64>; 3],
    total_requests: u64,
    errors: u64,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one attempt. A latency is appended only for attempts that
    /// produced a response; an attempt without one is always an error.
    pub fn record(&mut self, category: Category, latency_ms: Option<f64>, success: bool) {
        self.total_requests += 1;
        match latency_ms {
            Some(ms) => {
                self.samples[category.index()].push(ms);
                if !success {
                    self.errors += 1;
                }
            }
            None => self.errors += 1,
        }
    }

    pub fn apply(&mut self, completion: Completion) {
        self.record(completion.category, completion.latency_ms, completion.success);
    }

    /// Samples for `category` in completion order.
    pub fn samples(&self, category: Category) -> &[f64] {
        &self.samples[category.index()]
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    pub fn successes(&self) -> u64 {
        self.total_requests - self.errors
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total_requests: self.total_requests,
            errors: self.errors,
        }
    }
}

/// Cloneable handle workers use to report completions to the aggregator.
#[derive(Debug, Clone)]
pub struct Recorder {
    tx: mpsc::UnboundedSender<Completion>,
}

impl Recorder {
    pub fn record(&self, category: Category, latency_ms: Option<f64>, success: bool) {
        // The aggregator only stops once every recorder is dropped, so a
        // failed send cannot happen while `self` is alive.
        let _ = self.tx.send(Completion {
            category,
            latency_ms,
            success,
        });
    }
}

/// Owner of the run's `MetricsSink`, fed through `Recorder` handles.
pub struct Aggregator {
    handle: JoinHandle<MetricsSink>,
    progress: watch::Receiver<ProgressSnapshot>,
}

impl Aggregator {
    /// Spawn the aggregation task. It exits and yields the final sink once
    /// every `Recorder` clone has been dropped.
    pub fn spawn() -> (Recorder, Aggregator) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let (progress_tx, progress_rx) = watch::channel(ProgressSnapshot::default());

        let handle = tokio::spawn(async move {
            let mut sink = MetricsSink::new();
            while let Some(completion) = rx.recv().await {
                sink.apply(completion);
                progress_tx.send_replace(sink.snapshot());
            }
            sink
        });

        (
            Recorder { tx },
            Aggregator {
                handle,
                progress: progress_rx,
            },
        )
    }

    /// Receiver for the latest counters; reads may lag the writers slightly.
    pub fn progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.clone()
    }

    pub async fn finish(self) -> Result<MetricsSink, tokio::task::JoinError> {
        self.handle.await
    }
}

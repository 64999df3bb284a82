use crate::client::LeaderboardClient;
use crate::config::RunConfig;
use crate::error::LoadError;
use crate::executor::Executor;
use crate::report::{format_thousands, Report};
use crate::stats::{Aggregator, ProgressSnapshot};
use crate::worker::{self, WorkerSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};

/// Destination for the human-readable lines emitted during a run.
pub trait ProgressSink: Send + Sync {
    fn line(&self, line: &str);
}

/// Writes progress lines to standard output.
pub struct StdoutProgress;

impl ProgressSink for StdoutProgress {
    fn line(&self, line: &str) {
        println!("{line}");
    }
}

/// Single `GET /health`; anything but 200 is fatal for the run.
pub async fn health_check(client: &dyn LeaderboardClient, base_url: &str) -> Result<(), LoadError> {
    match client.health().await {
        Ok(200) => Ok(()),
        Ok(status) => Err(LoadError::HealthCheckStatus(status)),
        Err(source) => Err(LoadError::Unreachable {
            url: base_url.to_string(),
            source,
        }),
    }
}

pub fn format_progress(elapsed: Duration, snapshot: ProgressSnapshot) -> String {
    let secs = elapsed.as_secs_f64();
    let rps = if secs > 0.0 {
        snapshot.total_requests as f64 / secs
    } else {
        0.0
    };
    format!(
        "  [{:.0}s] Requests: {} | Errors: {} | RPS: {:.0}",
        secs,
        format_thousands(snapshot.total_requests),
        snapshot.errors,
        rps
    )
}

/// Print a progress line every `every` until the next tick would fall past
/// `deadline`.
async fn report_progress(
    start: Instant,
    deadline: Instant,
    every: Duration,
    progress: watch::Receiver<ProgressSnapshot>,
    sink: Arc<dyn ProgressSink>,
) {
    let mut next = start + every;
    while next <= deadline {
        sleep_until(next).await;
        let snapshot = *progress.borrow();
        sink.line(&format_progress(start.elapsed(), snapshot));
        next += every;
    }
}

/// Run the whole load test: health check, worker pool, progress reporter,
/// then the final report. Only configuration and health-check failures are
/// returned as errors; no load is generated in either case.
pub async fn run_load_test(
    config: &RunConfig,
    client: Arc<dyn LeaderboardClient>,
    progress: Arc<dyn ProgressSink>,
) -> Result<Report, LoadError> {
    config.validate()?;

    health_check(client.as_ref(), config.base_url()).await?;
    progress.line("Server health check passed ✓\n");

    let concurrency = config.scenario.concurrency;
    let settings = WorkerSettings {
        mix: config.mix,
        think_time_min_ms: config.pacing.think_time_min_ms,
        think_time_max_ms: config.pacing.think_time_max_ms,
    };

    let (recorder, aggregator) = Aggregator::spawn();
    let in_flight = Arc::new(Semaphore::new(concurrency));
    let executor = Executor::new(client.clone(), recorder, in_flight, config.scenario.max_user_id);

    let start = Instant::now();
    let deadline = start + config.duration();
    info!(
        client = client.name(),
        concurrency,
        duration_secs = config.scenario.duration_secs,
        "starting workers"
    );

    let mut workers = Vec::with_capacity(concurrency);
    for worker_id in 0..concurrency {
        let rng = worker::worker_rng(config.scenario.seed, worker_id);
        workers.push(tokio::spawn(worker::run(
            worker_id,
            executor.clone(),
            settings,
            deadline,
            rng,
        )));
    }
    // Workers hold the remaining recorders; the aggregator ends with them.
    drop(executor);

    let reporter = tokio::spawn(report_progress(
        start,
        deadline,
        config.progress_every(),
        aggregator.progress(),
        progress,
    ));

    let mut issued = 0u64;
    for (worker_id, handle) in workers.into_iter().enumerate() {
        match handle.await {
            Ok(n) => issued += n,
            Err(e) => warn!(worker_id, error = %e, "worker task failed"),
        }
    }
    if let Err(e) = reporter.await {
        warn!(error = %e, "progress reporter failed");
    }
    let elapsed = start.elapsed();

    let sink = match aggregator.finish().await {
        Ok(sink) => sink,
        Err(e) => {
            warn!(error = %e, "metrics aggregator failed");
            Default::default()
        }
    };
    info!(issued, recorded = sink.total_requests(), "all workers finished");

    Ok(Report::generate(&sink, elapsed))
}

use crate::executor::Executor;
use crate::mix::TrafficMix;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Per-worker settings that do not change during a run.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub mix: TrafficMix,
    pub think_time_min_ms: u64,
    pub think_time_max_ms: u64,
}

/// Build the RNG for worker `worker_id`. With a seed every worker gets its own
/// reproducible stream; without one each worker is seeded from entropy.
pub fn worker_rng(seed: Option<u64>, worker_id: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker_id as u64)),
        None => StdRng::from_entropy(),
    }
}

/// Draw a think-time uniformly from the configured bounds (inclusive).
pub fn think_time(settings: &WorkerSettings, rng: &mut impl Rng) -> Duration {
    let ms = rng.gen_range(settings.think_time_min_ms..=settings.think_time_max_ms);
    Duration::from_millis(ms)
}

/// Issue operations until `deadline`, pausing a think-time between them.
/// An operation started before the deadline always runs to completion.
/// A panicking operation is counted as an error and the loop carries on.
/// Returns the number of operations issued.
pub async fn run(
    worker_id: usize,
    executor: Executor,
    settings: WorkerSettings,
    deadline: Instant,
    mut rng: StdRng,
) -> u64 {
    debug!(worker_id, "worker started");
    let mut issued = 0u64;

    while Instant::now() < deadline {
        let category = settings.mix.sample(&mut rng);
        let attempt = AssertUnwindSafe(executor.execute(category, &mut rng))
            .catch_unwind()
            .await;
        if attempt.is_err() {
            warn!(worker_id, %category, "operation panicked");
            executor.record_failure(category);
        }
        issued += 1;

        sleep(think_time(&settings, &mut rng)).await;
    }

    debug!(worker_id, issued, "worker finished");
    issued
}

use crate::client::{LeaderboardClient, ScoreSubmission};
use crate::error::ClientError;
use crate::stats::{Category, Completion, Recorder};
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

pub const MIN_SCORE: u64 = 10;
pub const MAX_SCORE: u64 = 5_000;

/// Status code that counts as success for `category`.
pub fn expected_status(category: Category) -> u16 {
    match category {
        Category::Submit => 201,
        Category::Top | Category::Rank => 200,
    }
}

/// Turn the result of one attempt into the completion to record.
/// Transport failures carry no latency.
pub fn classify(category: Category, result: &Result<u16, ClientError>, elapsed_ms: f64) -> Completion {
    match result {
        Ok(status) => Completion {
            category,
            latency_ms: Some(elapsed_ms),
            success: *status == expected_status(category),
        },
        Err(_) => Completion {
            category,
            latency_ms: None,
            success: false,
        },
    }
}

/// Everything an operation needs, shared by all workers of a run.
#[derive(Clone)]
pub struct Executor {
    client: Arc<dyn LeaderboardClient>,
    recorder: Recorder,
    in_flight: Arc<Semaphore>,
    max_user_id: u64,
}

impl Executor {
    pub fn new(
        client: Arc<dyn LeaderboardClient>,
        recorder: Recorder,
        in_flight: Arc<Semaphore>,
        max_user_id: u64,
    ) -> Self {
        Self {
            client,
            recorder,
            in_flight,
            max_user_id,
        }
    }

    /// Issue one request of `category`, time it and record it exactly once.
    pub async fn execute(&self, category: Category, rng: &mut impl Rng) -> Completion {
        let request = match category {
            Category::Submit => Request::Submit(ScoreSubmission {
                user_id: rng.gen_range(1..=self.max_user_id),
                score: rng.gen_range(MIN_SCORE..=MAX_SCORE),
            }),
            Category::Top => Request::Top,
            Category::Rank => Request::Rank(rng.gen_range(1..=self.max_user_id)),
        };

        // Held for the whole request; the semaphore is never closed.
        let _permit = self.in_flight.acquire().await.ok();

        let start = Instant::now();
        let result = match request {
            Request::Submit(submission) => self.client.submit_score(submission).await,
            Request::Top => self.client.top().await,
            Request::Rank(user_id) => self.client.rank(user_id).await,
        };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let completion = classify(category, &result, elapsed_ms);
        self.recorder
            .record(completion.category, completion.latency_ms, completion.success);
        completion
    }

    /// Record an attempt that ended without a classifiable outcome.
    pub fn record_failure(&self, category: Category) {
        self.recorder.record(category, None, false);
    }
}

enum Request {
    Submit(ScoreSubmission),
    Top,
    Rank(u64),
}

use crate::error::{ClientError, LoadError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

pub type ClientFuture<'a> = Pin<Box<dyn Future<Output = Result<u16, ClientError>> + Send + 'a>>;

pub const HEALTH_PATH: &str = "/health";
pub const SUBMIT_PATH: &str = "/api/leaderboard/submit";
pub const TOP_PATH: &str = "/api/leaderboard/top";
pub const RANK_PATH: &str = "/api/leaderboard/rank";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub user_id: u64,
    pub score: u64,
}

/// Trait for leaderboard service adapters. Every call resolves to the HTTP
/// status code, or a `ClientError` when no response arrived.
pub trait LeaderboardClient: Send + Sync {
    fn name(&self) -> &'static str;

    fn health(&self) -> ClientFuture<'_>;

    fn submit_score(&self, submission: ScoreSubmission) -> ClientFuture<'_>;

    fn top(&self) -> ClientFuture<'_>;

    fn rank(&self, user_id: u64) -> ClientFuture<'_>;
}

/// reqwest-backed client. One instance, and so one connection pool, is
/// shared by every worker.
pub struct HttpLeaderboardClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLeaderboardClient {
    pub fn new(base_url: &str, timeout: Duration, max_idle_per_host: usize) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(300))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| LoadError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, url: String) -> ClientFuture<'_> {
        Box::pin(send(self.client.get(url)))
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<u16, ClientError> {
    let response = request.send().await?;
    Ok(response.status().as_u16())
}

impl LeaderboardClient for HttpLeaderboardClient {
    fn name(&self) -> &'static str {
        "http"
    }

    fn health(&self) -> ClientFuture<'_> {
        self.get(self.url(HEALTH_PATH))
    }

    fn submit_score(&self, submission: ScoreSubmission) -> ClientFuture<'_> {
        Box::pin(send(self.client.post(self.url(SUBMIT_PATH)).json(&submission)))
    }

    fn top(&self) -> ClientFuture<'_> {
        self.get(self.url(TOP_PATH))
    }

    fn rank(&self, user_id: u64) -> ClientFuture<'_> {
        self.get(format!("{}/{}", self.url(RANK_PATH), user_id))
    }
}

/// In-process client for testing: fixed latency, configurable statuses,
/// and call accounting including the peak number of concurrent calls.
pub struct MockLeaderboardClient {
    delay: Duration,
    health_status: u16,
    load_status: Option<u16>,
    fail_transport: bool,
    load_calls: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockLeaderboardClient {
    /// Healthy service answering 201 to submits and 200 to reads.
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            health_status: 200,
            load_status: None,
            fail_transport: false,
            load_calls: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_health_status(mut self, status: u16) -> Self {
        self.health_status = status;
        self
    }

    /// Answer every load request with `status` instead of the success code.
    pub fn with_load_status(mut self, status: u16) -> Self {
        self.load_status = Some(status);
        self
    }

    /// Fail every load request without a response.
    pub fn with_transport_failure(mut self) -> Self {
        self.fail_transport = true;
        self
    }

    /// Number of submit/top/rank calls issued so far.
    pub fn load_calls(&self) -> u64 {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, success_status: u16) -> ClientFuture<'_> {
        Box::pin(async move {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            sleep(self.delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail_transport {
                Err(ClientError::transport("connection refused"))
            } else {
                Ok(self.load_status.unwrap_or(success_status))
            }
        })
    }
}

impl LeaderboardClient for MockLeaderboardClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn health(&self) -> ClientFuture<'_> {
        let status = self.health_status;
        Box::pin(async move { Ok::<u16, ClientError>(status) })
    }

    fn submit_score(&self, _submission: ScoreSubmission) -> ClientFuture<'_> {
        self.respond(201)
    }

    fn top(&self) -> ClientFuture<'_> {
        self.respond(200)
    }

    fn rank(&self, _user_id: u64) -> ClientFuture<'_> {
        self.respond(200)
    }
}

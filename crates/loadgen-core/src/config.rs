use crate::error::LoadError;
use crate::mix::TrafficMix;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://localhost:3001";
pub const DEFAULT_MAX_USER_ID: u64 = 1_000_000;
pub const DEFAULT_DURATION_SECS: u64 = 60;
pub const DEFAULT_CONCURRENCY: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub mix: TrafficMix,
    #[serde(default)]
    pub pacing: PacingConfig,
}

impl RunConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Reject configurations the run loop cannot honour.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.target.url.trim().is_empty() {
            return Err(LoadError::InvalidConfig("target.url must not be empty".into()));
        }
        if self.target.timeout_ms == 0 {
            return Err(LoadError::InvalidConfig("target.timeout_ms must be non-zero".into()));
        }
        if self.scenario.max_user_id == 0 {
            return Err(LoadError::InvalidConfig("scenario.max_user_id must be at least 1".into()));
        }
        if self.scenario.concurrency == 0 {
            return Err(LoadError::InvalidConfig("scenario.concurrency must be at least 1".into()));
        }
        if self.pacing.think_time_min_ms > self.pacing.think_time_max_ms {
            return Err(LoadError::InvalidConfig(format!(
                "pacing.think_time_min_ms ({}) exceeds think_time_max_ms ({})",
                self.pacing.think_time_min_ms, self.pacing.think_time_max_ms
            )));
        }
        if self.pacing.progress_every_ms == 0 {
            return Err(LoadError::InvalidConfig("pacing.progress_every_ms must be non-zero".into()));
        }
        self.mix.validate()
    }

    /// Base URL without a trailing slash, so paths can be appended directly.
    pub fn base_url(&self) -> &str {
        self.target.url.trim_end_matches('/')
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.scenario.duration_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.target.timeout_ms)
    }

    pub fn progress_every(&self) -> Duration {
        Duration::from_millis(self.pacing.progress_every_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Base URL of the leaderboard service
    #[serde(default = "default_url")]
    pub url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Largest user id drawn (inclusive); ids start at 1
    #[serde(default = "default_max_user_id")]
    pub max_user_id: u64,
    /// How long workers keep starting new operations
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    /// Number of workers, also the cap on in-flight requests
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Seed for reproducible draws; entropy is used when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            max_user_id: default_max_user_id(),
            duration_secs: default_duration_secs(),
            concurrency: default_concurrency(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_think_time_min_ms")]
    pub think_time_min_ms: u64,
    #[serde(default = "default_think_time_max_ms")]
    pub think_time_max_ms: u64,
    /// Interval between progress lines
    #[serde(default = "default_progress_every_ms")]
    pub progress_every_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            think_time_min_ms: default_think_time_min_ms(),
            think_time_max_ms: default_think_time_max_ms(),
            progress_every_ms: default_progress_every_ms(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_user_id() -> u64 {
    DEFAULT_MAX_USER_ID
}

fn default_duration_secs() -> u64 {
    DEFAULT_DURATION_SECS
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_think_time_min_ms() -> u64 {
    10
}

fn default_think_time_max_ms() -> u64 {
    50
}

fn default_progress_every_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde() {
        let config_str = r#"
[target]
url = "http://leaderboard.internal:8080/"
timeout_ms = 2000

[scenario]
max_user_id = 5000
duration_secs = 30
concurrency = 8
seed = 42

[mix]
submit = 0.5
top = 0.3
rank = 0.2
        "#;

        let config: RunConfig = toml::from_str(config_str).unwrap();
        assert_eq!(config.base_url(), "http://leaderboard.internal:8080");
        assert_eq!(config.timeout(), Duration::from_secs(2));
        assert_eq!(config.scenario.max_user_id, 5000);
        assert_eq!(config.duration(), Duration::from_secs(30));
        assert_eq!(config.scenario.concurrency, 8);
        assert_eq!(config.scenario.seed, Some(42));
        assert_eq!(config.mix.top, 0.3);
        // pacing section omitted entirely
        assert_eq!(config.pacing.think_time_min_ms, 10);
        assert_eq!(config.pacing.think_time_max_ms, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: RunConfig = toml::from_str("").unwrap();
        assert_eq!(config.target.url, DEFAULT_URL);
        assert_eq!(config.target.timeout_ms, 5_000);
        assert_eq!(config.scenario.max_user_id, 1_000_000);
        assert_eq!(config.scenario.duration_secs, 60);
        assert_eq!(config.scenario.concurrency, 50);
        assert_eq!(config.progress_every(), Duration::from_secs(5));
        assert_eq!(config.mix, TrafficMix::default());
    }

    #[test]
    fn test_example_config_is_valid() {
        let config: RunConfig =
            toml::from_str(include_str!("../../../config/example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.mix, TrafficMix::default());
        assert_eq!(config.scenario.seed, None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RunConfig::default();
        config.scenario.concurrency = 0;
        assert!(matches!(config.validate(), Err(LoadError::InvalidConfig(_))));

        let mut config = RunConfig::default();
        config.scenario.max_user_id = 0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.pacing.think_time_min_ms = 60;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.mix.rank = 0.5;
        assert!(config.validate().is_err());
    }
}

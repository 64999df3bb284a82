use anyhow::{Context, Result};
use clap::Parser;
use loadgen_core::{
    format_thousands, run_load_test, HttpLeaderboardClient, LoadError, RunConfig, StdoutProgress,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "leaderboard-load")]
#[command(about = "Gaming leaderboard load tester - mixed submit/top/rank traffic")]
struct Args {
    /// Optional TOML configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Largest user id to draw (inclusive) [default: 1000000]
    #[arg(long)]
    users: Option<u64>,

    /// Run duration in seconds [default: 60]
    #[arg(long)]
    duration: Option<u64>,

    /// Number of concurrent workers and connections [default: 50]
    #[arg(long)]
    concurrency: Option<usize>,

    /// Base URL of the leaderboard service [default: http://localhost:3001]
    #[arg(long)]
    url: Option<String>,

    /// Seed for reproducible traffic
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?,
            None => RunConfig::default(),
        };

        if let Some(users) = self.users {
            config.scenario.max_user_id = users;
        }
        if let Some(duration) = self.duration {
            config.scenario.duration_secs = duration;
        }
        if let Some(concurrency) = self.concurrency {
            config.scenario.concurrency = concurrency;
        }
        if let Some(url) = self.url {
            config.target.url = url;
        }
        if self.seed.is_some() {
            config.scenario.seed = self.seed;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    config.validate().context("Invalid configuration")?;

    print_banner(&config);

    let client = HttpLeaderboardClient::new(
        config.base_url(),
        config.timeout(),
        config.scenario.concurrency,
    )
    .context("Failed to create HTTP client")?;

    let report = match run_load_test(&config, Arc::new(client), Arc::new(StdoutProgress)).await {
        Ok(report) => report,
        Err(e @ LoadError::HealthCheckStatus(_)) | Err(e @ LoadError::Unreachable { .. }) => {
            println!("{e}");
            anyhow::bail!("Aborted before generating load");
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        total_requests = report.total_requests,
        errors = report.errors,
        "load test complete"
    );
    print!("{report}");

    Ok(())
}

fn print_banner(config: &RunConfig) {
    println!("Starting load test...");
    println!("  Target:      {}", config.base_url());
    println!("  Users pool:  {}", format_thousands(config.scenario.max_user_id));
    println!("  Duration:    {}s", config.scenario.duration_secs);
    println!("  Concurrency: {} workers", config.scenario.concurrency);
    println!("  Traffic mix: {}", config.mix.describe());
    if let Some(seed) = config.scenario.seed {
        println!("  Seed:        {}", seed);
    }
    println!();
}

// src/bin/breaker_cli.rs

use prettytable::{row, Table};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio::time;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use circuit_breaker::breaker::{ChannelHandler, TripEvent};
use circuit_breaker::config::{BreakerConfig, CacheConfig, InMemoryConfig, RedisConfig};
use circuit_breaker::{factory, CircuitBreaker, StatusStorage};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "breaker_cli",
    about = "Simulate calls to a flaky service through a circuit breaker"
)]
struct Opt {
    /// Name of the simulated service
    #[structopt(short, long, default_value = "flaky-service")]
    service: String,

    /// Failures before the service is considered unavailable
    #[structopt(short, long, default_value = "5")]
    max_failures: u64,

    /// Seconds to wait before a retry probe is let through
    #[structopt(short, long, default_value = "2")]
    retry_timeout: u64,

    /// Probability that a call to the service fails (0.0 - 1.0)
    #[structopt(short, long, default_value = "0.5")]
    failure_rate: f64,

    /// Number of calls to simulate
    #[structopt(short = "n", long, default_value = "50")]
    num_calls: usize,

    /// Time between calls in milliseconds
    #[structopt(short = "t", long, default_value = "100")]
    call_interval_ms: u64,

    /// Storage backend
    #[structopt(long, possible_values = &["dummy", "memory", "redis"], default_value = "memory")]
    storage: String,

    /// Redis URL (when using redis storage)
    #[structopt(long, default_value = "redis://localhost:6379")]
    redis_url: String,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,
}

#[derive(Debug, Default)]
struct Summary {
    attempted: usize,
    succeeded: usize,
    failed: usize,
    rejected: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let opt = Opt::from_args();

    let log_level = match opt.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!(
            "breaker_cli={},circuit_breaker={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !(0.0..=1.0).contains(&opt.failure_rate) {
        return Err(format!("failure rate must be within 0.0..=1.0, got {}", opt.failure_rate).into());
    }

    let config = BreakerConfig {
        default_max_failures: opt.max_failures,
        default_retry_timeout: Duration::from_secs(opt.retry_timeout),
        ..BreakerConfig::from_env()?
    };

    match opt.storage.as_str() {
        "dummy" => simulate(factory::dummy_instance(config), &opt).await,
        "memory" => {
            let breaker =
                factory::memory_instance(config, CacheConfig::from_env()?, InMemoryConfig::default());
            simulate(breaker, &opt).await
        }
        "redis" => {
            let breaker = factory::redis_instance(
                config,
                CacheConfig::from_env()?,
                RedisConfig::new(opt.redis_url.clone()),
            )
            .await?;
            simulate(breaker, &opt).await
        }
        other => Err(format!("Unknown storage backend: {}", other).into()),
    }
}

async fn simulate<S: StatusStorage>(
    breaker: CircuitBreaker<S>,
    opt: &Opt,
) -> Result<(), Box<dyn std::error::Error>> {
    let (handler, mut trips) = ChannelHandler::new();
    breaker.register_handler(&opt.service, Arc::new(handler)).await;

    info!(
        service = %opt.service,
        max_failures = opt.max_failures,
        retry_timeout = opt.retry_timeout,
        failure_rate = opt.failure_rate,
        "Starting simulation"
    );

    let started = Instant::now();
    let mut summary = Summary::default();
    let mut rng = rand::rng();

    for call in 0..opt.num_calls {
        match breaker.is_available(&opt.service).await {
            Ok(true) => {
                summary.attempted += 1;
                if rng.random_bool(opt.failure_rate) {
                    summary.failed += 1;
                    breaker.report_failure(&opt.service).await?;
                    warn!(call, "Call failed");
                } else {
                    summary.succeeded += 1;
                    breaker.report_success(&opt.service).await?;
                    info!(call, "Call succeeded");
                }
            }
            Ok(false) => {
                summary.rejected += 1;
                info!(call, "Call rejected");
            }
            Err(e) => {
                error!(call, error = %e, "Breaker error");
                return Err(e.into());
            }
        }

        time::sleep(Duration::from_millis(opt.call_interval_ms)).await;
    }

    let mut events: Vec<TripEvent> = Vec::new();
    while let Ok(event) = trips.try_recv() {
        events.push(event);
    }

    print_summary(&summary, &events, breaker.failures(&opt.service).await?, started.elapsed());
    Ok(())
}

fn print_summary(summary: &Summary, events: &[TripEvent], failures: u64, elapsed: Duration) {
    let mut table = Table::new();
    table.add_row(row!["Metric", "Value"]);
    table.add_row(row!["Calls attempted", summary.attempted]);
    table.add_row(row!["Succeeded", summary.succeeded]);
    table.add_row(row!["Failed", summary.failed]);
    table.add_row(row!["Rejected by breaker", summary.rejected]);
    table.add_row(row!["Final failure count", failures]);
    table.add_row(row!["Elapsed", format!("{:.2?}", elapsed)]);
    table.printstd();

    if !events.is_empty() {
        let mut trips = Table::new();
        trips.add_row(row!["Time", "Failures", "Message"]);
        for event in events {
            trips.add_row(row![
                event.at.format("%H:%M:%S"),
                event.failures,
                event.message
            ]);
        }
        trips.printstd();
    }
}

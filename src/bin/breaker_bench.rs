// src/bin/breaker_bench.rs

use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio::sync::Barrier;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use circuit_breaker::breaker::ChannelHandler;
use circuit_breaker::config::{BreakerConfig, CacheConfig, InMemoryConfig, RedisConfig};
use circuit_breaker::{factory, CircuitBreaker, StatusStorage};

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "breaker_bench",
    about = "Benchmark a circuit breaker under many concurrent callers"
)]
struct Opt {
    /// Storage backend
    #[structopt(long, possible_values = &["dummy", "memory", "redis"], default_value = "memory")]
    storage: String,

    /// Redis URL (when using redis storage)
    #[structopt(long, default_value = "redis://localhost:6379")]
    redis_url: String,

    /// Number of concurrent callers
    #[structopt(short = "c", long, default_value = "32")]
    callers: usize,

    /// Calls made by each caller
    #[structopt(short = "n", long, default_value = "1000")]
    calls_per_caller: usize,

    /// Probability that a call to the service fails (0.0 - 1.0)
    #[structopt(short, long, default_value = "0.3")]
    failure_rate: f64,

    /// Failures before the service is considered unavailable
    #[structopt(short, long, default_value = "20")]
    max_failures: u64,

    /// Seconds to wait before a retry probe is let through
    #[structopt(short, long, default_value = "1")]
    retry_timeout: u64,

    /// Disable logs
    #[structopt(long)]
    disable_logs: bool,
}

const SERVICE: &str = "bench-service";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let filter = if opt.disable_logs {
        "breaker_bench=error,circuit_breaker=error"
    } else {
        "breaker_bench=info,circuit_breaker=warn"
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(filter))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = BreakerConfig {
        default_max_failures: opt.max_failures,
        default_retry_timeout: Duration::from_secs(opt.retry_timeout),
        ..BreakerConfig::default()
    };

    let storage = opt.storage.clone();
    match storage.as_str() {
        "dummy" => run_benchmark(factory::dummy_instance(config), "Dummy", opt).await,
        "memory" => {
            let breaker = factory::memory_instance(
                config,
                CacheConfig::default(),
                InMemoryConfig {
                    max_entries: 100_000,
                    ..InMemoryConfig::default()
                },
            );
            run_benchmark(breaker, "Memory", opt).await
        }
        "redis" => {
            let breaker = match factory::redis_instance(
                config,
                CacheConfig::default(),
                RedisConfig::new(opt.redis_url.clone()),
            )
            .await
            {
                Ok(breaker) => breaker,
                Err(e) => {
                    error!("Failed to connect to Redis: {}", e);
                    return Err(format!("Failed to connect to Redis: {}", e).into());
                }
            };
            run_benchmark(breaker, "Redis (aggregated)", opt).await
        }
        other => Err(format!("Unknown storage backend: {}", other).into()),
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct CallerStats {
    attempted: usize,
    rejected: usize,
    errors: usize,
}

async fn run_benchmark<S>(
    breaker: CircuitBreaker<S>,
    name: &str,
    opt: Opt,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: StatusStorage + 'static,
{
    println!("\nRunning benchmark: {}", name);
    println!("======================={}", "=".repeat(name.len()));

    let (handler, mut trips) = ChannelHandler::new();
    breaker.register_handler(SERVICE, Arc::new(handler)).await;
    let retry_message = breaker.retry_message().to_string();

    let breaker = Arc::new(breaker);
    let total_calls = (opt.callers * opt.calls_per_caller) as u64;
    let progress = ProgressBar::new(total_calls);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} calls ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let barrier = Arc::new(Barrier::new(opt.callers));
    let mut handles = Vec::with_capacity(opt.callers);
    let start_time = Instant::now();

    for _ in 0..opt.callers {
        let breaker = Arc::clone(&breaker);
        let barrier = Arc::clone(&barrier);
        let progress = progress.clone();
        let calls = opt.calls_per_caller;
        let failure_rate = opt.failure_rate;
        let disable_logs = opt.disable_logs;

        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let mut stats = CallerStats::default();

            for _ in 0..calls {
                match breaker.is_available(SERVICE).await {
                    Ok(true) => {
                        stats.attempted += 1;
                        let failed = rand::rng().random_bool(failure_rate);
                        let report = if failed {
                            breaker.report_failure(SERVICE).await
                        } else {
                            breaker.report_success(SERVICE).await
                        };
                        if let Err(e) = report {
                            stats.errors += 1;
                            if !disable_logs {
                                warn!("Error reporting outcome: {}", e);
                            }
                        }
                    }
                    Ok(false) => stats.rejected += 1,
                    Err(e) => {
                        stats.errors += 1;
                        if !disable_logs {
                            warn!("Error checking availability: {}", e);
                        }
                    }
                }
                progress.inc(1);
            }

            stats
        }));
    }

    let results = futures::future::join_all(handles).await;
    let elapsed = start_time.elapsed();
    progress.finish_and_clear();

    let mut totals = CallerStats::default();
    for stats in results.into_iter().flatten() {
        totals.attempted += stats.attempted;
        totals.rejected += stats.rejected;
        totals.errors += stats.errors;
    }

    let mut notifications = 0usize;
    let mut probes = 0usize;
    while let Ok(event) = trips.try_recv() {
        notifications += 1;
        if event.message == retry_message {
            probes += 1;
        }
    }

    info!(elapsed = ?elapsed, "Benchmark finished");
    println!("\nBenchmark Results for {}:", name);
    println!("  Total Calls:        {}", total_calls);
    println!(
        "  Attempted:          {} ({:.1}%)",
        totals.attempted,
        100.0 * totals.attempted as f64 / total_calls as f64
    );
    println!(
        "  Rejected:           {} ({:.1}%)",
        totals.rejected,
        100.0 * totals.rejected as f64 / total_calls as f64
    );
    println!("  Errors:             {}", totals.errors);
    println!("  Trip notifications: {}", notifications);
    println!("  Retry probes:       {}", probes);
    println!(
        "  Final failures:     {}",
        breaker.failures(SERVICE).await?
    );
    println!("  Duration:           {:?}", elapsed);
    println!(
        "  Throughput:         {:.2} calls/second",
        total_calls as f64 / elapsed.as_secs_f64()
    );

    Ok(())
}

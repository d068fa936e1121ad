use circuit_breaker::breaker::LoggingHandler;
use circuit_breaker::config::{CacheConfig, InMemoryConfig, LogFormat, RedisConfig};
use circuit_breaker::{factory, logging, BreakerConfig, CircuitBreaker, StatusStorage};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv().ok();
    match LogFormat::from_env() {
        Ok(format) => logging::init_with(format),
        Err(e) => {
            logging::init();
            error!(error = %e, "Invalid log format, using text");
        }
    }
    info!("Circuit breaker demo starting");

    let config = match BreakerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    let cache = match CacheConfig::from_env() {
        Ok(cache) => cache,
        Err(e) => {
            error!(error = %e, "Invalid cache configuration");
            std::process::exit(1);
        }
    };

    let outcome = match RedisConfig::from_env() {
        Some(redis) => match factory::redis_instance_with_fallback(config, cache, redis).await {
            Ok(breaker) => run_demo(&breaker).await,
            Err(e) => {
                error!(error = %e, "Could not connect to Redis");
                std::process::exit(1);
            }
        },
        None => {
            let breaker = factory::memory_instance(config, cache, InMemoryConfig::default());
            run_demo(&breaker).await
        }
    };

    if let Err(e) = outcome {
        error!(error = %e, "Demo failed");
        std::process::exit(1);
    }
}

async fn run_demo<S: StatusStorage>(breaker: &CircuitBreaker<S>) -> circuit_breaker::Result<()> {
    let service = "demo-service";
    breaker.register_handler(service, Arc::new(LoggingHandler)).await;
    let threshold = breaker.service_settings(service).await.max_failures;

    for _ in 0..=threshold {
        if breaker.is_available(service).await? {
            breaker.report_failure(service).await?;
        }
    }

    let failures = breaker.failures(service).await?;
    let available = breaker.is_available(service).await?;
    info!(service, failures, available, "Demo finished");
    Ok(())
}

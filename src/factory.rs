// src/factory.rs

//! Ready-made breaker stacks for the common backends.

use crate::breaker::CircuitBreaker;
use crate::config::{BreakerConfig, CacheConfig, InMemoryConfig, RedisConfig};
use crate::error::Result;
use crate::storage::{
    AggregateStorage, CacheAdapter, DummyStorage, FallbackStorage, MemoryStorage, RedisStorage,
    StorageBackend,
};

/// Breaker over a networked cache, batched through the aggregate record
pub type RedisBreaker = CircuitBreaker<AggregateStorage<CacheAdapter<RedisStorage>>>;

/// Same as [`RedisBreaker`], switching to transient local state on the first Redis error
pub type FallbackRedisBreaker =
    CircuitBreaker<FallbackStorage<AggregateStorage<CacheAdapter<RedisStorage>>>>;

/// Breaker over the process-wide TTL cache
pub type MemoryBreaker = CircuitBreaker<CacheAdapter<MemoryStorage>>;

/// State is lost with the breaker. For tests and short-lived jobs.
pub fn dummy_instance(config: BreakerConfig) -> CircuitBreaker<DummyStorage> {
    CircuitBreaker::new(DummyStorage::new(), config)
}

/// Each attribute is its own cache entry; local access is cheap enough that
/// batching would only add work.
pub fn memory_instance(
    config: BreakerConfig,
    cache: CacheConfig,
    memory: InMemoryConfig,
) -> MemoryBreaker {
    let storage = CacheAdapter::new(MemoryStorage::new(memory), cache);
    CircuitBreaker::new(storage, config)
}

/// Connects to Redis and batches all services into one key.
///
/// Redis errors come back from every breaker call; wrap the storage in a
/// [`FallbackStorage`] (or use [`redis_instance_with_fallback`]) to keep
/// counting locally instead.
pub async fn redis_instance(
    config: BreakerConfig,
    cache: CacheConfig,
    redis: RedisConfig,
) -> Result<RedisBreaker> {
    let backend = RedisStorage::new(redis).await?;
    Ok(CircuitBreaker::new(aggregated(backend, cache), config))
}

/// [`redis_instance`] that keeps working on transient local state after the
/// first Redis error
pub async fn redis_instance_with_fallback(
    config: BreakerConfig,
    cache: CacheConfig,
    redis: RedisConfig,
) -> Result<FallbackRedisBreaker> {
    let backend = RedisStorage::new(redis).await?;
    let storage = FallbackStorage::new(aggregated(backend, cache));
    Ok(CircuitBreaker::new(storage, config))
}

fn aggregated<B>(backend: B, cache: CacheConfig) -> AggregateStorage<CacheAdapter<B>>
where
    B: StorageBackend,
{
    AggregateStorage::new(CacheAdapter::new(backend, cache))
}

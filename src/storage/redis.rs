// src/storage/redis.rs

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RedisConfig;
use crate::error::{BreakerError, Result, StorageError};
use crate::storage::StorageBackend;

/// Networked cache backend, for sharing breaker state across machines
pub struct RedisStorage {
    client: Client,
    connection: Arc<tokio::sync::Mutex<ConnectionManager>>,
    config: RedisConfig,
}

// ConnectionManager has no Debug
impl fmt::Debug for RedisStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStorage")
            .field("url", &self.config.url)
            .field("connection_timeout", &self.config.connection_timeout)
            .finish()
    }
}

impl Clone for RedisStorage {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            connection: Arc::clone(&self.connection),
            config: self.config.clone(),
        }
    }
}

fn command_error(e: redis::RedisError) -> BreakerError {
    BreakerError::Storage(StorageError::RedisCommand(e.to_string()))
}

impl RedisStorage {
    /// Creates a new Redis storage with the given configuration
    pub async fn new(config: RedisConfig) -> Result<Self> {
        // Open the client - this doesn't actually connect to Redis yet
        let client = Client::open(config.url.as_str())
            .map_err(|e| BreakerError::Storage(StorageError::RedisConnection(e.to_string())))?;

        let connection_future = ConnectionManager::new(client.clone());

        let connection_manager =
            match tokio::time::timeout(config.connection_timeout, connection_future).await {
                Ok(result) => result.map_err(|e| {
                    BreakerError::Storage(StorageError::RedisConnection(e.to_string()))
                })?,
                Err(_) => {
                    return Err(BreakerError::Storage(StorageError::RedisConnection(
                        format!(
                            "Connection to Redis at {} timed out after {:?}",
                            config.url, config.connection_timeout
                        ),
                    )));
                }
            };

        Ok(Self {
            client,
            connection: Arc::new(tokio::sync::Mutex::new(connection_manager)),
            config,
        })
    }

    /// Ping Redis to check health with timeout
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.lock().await;

        let ping_future = redis::AsyncCommands::ping::<String>(&mut *conn);

        let result = match tokio::time::timeout(self.config.connection_timeout, ping_future).await {
            Ok(inner_result) => inner_result.map_err(command_error)?,
            Err(_) => {
                return Err(BreakerError::Storage(StorageError::RedisCommand(format!(
                    "Redis PING operation timed out after {:?}",
                    self.config.connection_timeout
                ))));
            }
        };

        if result == "PONG" {
            Ok(())
        } else {
            Err(BreakerError::Storage(StorageError::RedisCommand(format!(
                "Unexpected response from Redis PING: {}",
                result
            ))))
        }
    }
}

#[async_trait]
impl StorageBackend for RedisStorage {
    type Config = RedisConfig;

    async fn new(config: Self::Config) -> Result<Self> {
        Self::new(config).await
    }

    fn check_ready(&self) -> Result<()> {
        // an instance only exists once the connection manager is up
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection.lock().await;
        let result: Option<Vec<u8>> = redis::AsyncCommands::get(&mut *conn, key)
            .await
            .map_err(command_error)?;

        Ok(result)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection.lock().await;

        match ttl {
            // SETEX rejects 0, so sub-second TTLs round up
            Some(ttl) => {
                let _: () = conn
                    .set_ex(key, value, ttl.as_secs().max(1))
                    .await
                    .map_err(command_error)?;
            }
            None => {
                let _: () = conn.set(key, value).await.map_err(command_error)?;
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.lock().await;
        let result: i64 = conn.del(key).await.map_err(command_error)?;

        Ok(result > 0)
    }
}

// for error definitions
use redis;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BreakerError {
    /// Errors related to the storage backend. The storage instance that
    /// produced it must not be used again.
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing medium is missing, closed or otherwise unusable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Redis connection errors
    #[error("Redis connection error: {0}")]
    RedisConnection(String),

    // Redis authentication errors
    #[error("Redis authentication error: {0}")]
    RedisAuth(String),

    /// Redis command errors
    #[error("Redis command error: {0}")]
    RedisCommand(String),

    /// Data serialization/deserialization errors
    #[error("Data serialization error: {0}")]
    Serialization(String),

    /// In-memory store is full
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),
}

impl From<StorageError> for BreakerError {
    fn from(err: StorageError) -> Self {
        BreakerError::Storage(err)
    }
}

// Implement conversions from redis::RedisError to StorageError
impl From<redis::RedisError> for BreakerError {
    fn from(err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::AuthenticationFailed => {
                BreakerError::Storage(StorageError::RedisAuth(err.to_string()))
            }
            redis::ErrorKind::IoError | redis::ErrorKind::ClientError => {
                BreakerError::Storage(StorageError::RedisConnection(err.to_string()))
            }
            _ => BreakerError::Storage(StorageError::RedisCommand(err.to_string())),
        }
    }
}

// implement conversions from serde_json::Error to BreakerError
impl From<serde_json::Error> for BreakerError {
    fn from(err: serde_json::Error) -> Self {
        BreakerError::Storage(StorageError::Serialization(err.to_string()))
    }
}

impl BreakerError {
    /// True when the error came from the storage layer
    pub fn is_storage(&self) -> bool {
        matches!(self, BreakerError::Storage(_))
    }
}

// define a Result type alias for convenience
pub type Result<T> = std::result::Result<T, BreakerError>;

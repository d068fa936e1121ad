// src/config/mod.rs

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{BreakerError, Result};

/// Environment variable prefix read by the `from_env` constructors
pub const ENV_PREFIX: &str = "CIRCUIT_BREAKER_";

/// Instance-wide settings of a circuit breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Failures tolerated before a service is considered unavailable
    #[serde(default = "default_max_failures")]
    pub default_max_failures: u64,

    /// How long to wait after the last state change before letting a probe through
    #[serde(default = "default_retry_timeout", with = "duration_secs")]
    pub default_retry_timeout: Duration,

    /// Message passed to trip handlers when a service reaches its threshold
    #[serde(default = "default_unavailable_message")]
    pub unavailable_message: String,

    /// Message passed to trip handlers when a retry probe is admitted
    #[serde(default = "default_retry_message")]
    pub retry_message: String,

    /// Treat every service as one that must have a trip handler registered
    #[serde(default)]
    pub require_trip_handlers: bool,
}

fn default_max_failures() -> u64 {
    20
}

fn default_retry_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_unavailable_message() -> String {
    "Service No Longer Available".to_string()
}

fn default_retry_message() -> String {
    "Retrying Service".to_string()
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            default_max_failures: default_max_failures(),
            default_retry_timeout: default_retry_timeout(),
            unavailable_message: default_unavailable_message(),
            retry_message: default_retry_message(),
            require_trip_handlers: false,
        }
    }
}

impl BreakerConfig {
    /// Builds a config from `CIRCUIT_BREAKER_*` variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = env_parse::<u64>("MAX_FAILURES")? {
            config.default_max_failures = v;
        }
        if let Some(v) = env_parse::<u64>("RETRY_TIMEOUT")? {
            config.default_retry_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_var("UNAVAILABLE_MESSAGE") {
            config.unavailable_message = v;
        }
        if let Some(v) = env_var("RETRY_MESSAGE") {
            config.retry_message = v;
        }
        if let Some(v) = env_parse::<bool>("REQUIRE_TRIP_HANDLERS")? {
            config.require_trip_handlers = v;
        }
        Ok(config)
    }
}

/// Settings shared by the key-value cache adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long an entry survives without being written again
    #[serde(default = "default_ttl", with = "duration_secs")]
    pub ttl: Duration,

    /// Prepended to every key written to the backend
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,
}

fn default_ttl() -> Duration {
    Duration::from_secs(3600)
}

fn default_cache_prefix() -> String {
    "CircuitBreaker".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            cache_prefix: default_cache_prefix(),
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = env_parse::<u64>("TTL")? {
            config.ttl = Duration::from_secs(v);
        }
        if let Some(v) = env_var("CACHE_PREFIX") {
            config.cache_prefix = v;
        }
        Ok(config)
    }
}

/// Configuration for Redis storage backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection timeout
    #[serde(default = "default_conn_timeout", with = "duration_millis")]
    pub connection_timeout: Duration,
}

fn default_conn_timeout() -> Duration {
    Duration::from_secs(2)
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connection_timeout: default_conn_timeout(),
        }
    }

    /// Reads `CIRCUIT_BREAKER_REDIS_URL`; `None` when unset
    pub fn from_env() -> Option<Self> {
        env_var("REDIS_URL").map(Self::new)
    }
}

/// Configuration for in-memory storage backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryConfig {
    /// Maximum number of entries to store
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Whether to use a background task for expiration
    #[serde(default = "default_use_background_task")]
    pub use_background_task: bool,

    /// How often to run the background expiration task; zero disables it
    #[serde(default = "default_cleanup_interval", with = "duration_millis")]
    pub cleanup_interval: Duration,
}

fn default_max_entries() -> usize {
    10_000
}

fn default_use_background_task() -> bool {
    true
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            use_background_task: default_use_background_task(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {:?}", other)),
        }
    }
}

impl LogFormat {
    /// Reads `CIRCUIT_BREAKER_LOG_FORMAT`, text when unset
    pub fn from_env() -> Result<Self> {
        Ok(env_parse("LOG_FORMAT")?.unwrap_or_default())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, name)).ok()
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            BreakerError::Config(format!("invalid {}{}={:?}: {}", ENV_PREFIX, name, raw, e))
        }),
        None => Ok(None),
    }
}

// Helper modules to serialize/deserialize Duration with serde
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_defaults() {
        let config = BreakerConfig::default();
        assert_eq!(config.default_max_failures, 20);
        assert_eq!(config.default_retry_timeout, Duration::from_secs(60));
        assert_eq!(config.unavailable_message, "Service No Longer Available");
        assert_eq!(config.retry_message, "Retrying Service");
        assert!(!config.require_trip_handlers);
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let config: BreakerConfig =
            serde_json::from_str(r#"{"default_max_failures": 5, "default_retry_timeout": 30}"#)
                .unwrap();
        assert_eq!(config.default_max_failures, 5);
        assert_eq!(config.default_retry_timeout, Duration::from_secs(30));
        assert_eq!(config.retry_message, "Retrying Service");

        let cache: CacheConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cache.ttl, Duration::from_secs(3600));
        assert_eq!(cache.cache_prefix, "CircuitBreaker");
    }

    #[test]
    fn test_durations_serialize_in_their_units() {
        let json = serde_json::to_value(CacheConfig::default()).unwrap();
        assert_eq!(json["ttl"], 3600);

        let json = serde_json::to_value(InMemoryConfig::default()).unwrap();
        assert_eq!(json["cleanup_interval"], 60_000);
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" JSON ".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    // Env-driven tests share process state, so they run in one function
    #[test]
    fn test_from_env() {
        env::set_var("CIRCUIT_BREAKER_MAX_FAILURES", "7");
        env::set_var("CIRCUIT_BREAKER_RETRY_TIMEOUT", "15");
        env::set_var("CIRCUIT_BREAKER_CACHE_PREFIX", "cb:");
        let config = BreakerConfig::from_env().unwrap();
        assert_eq!(config.default_max_failures, 7);
        assert_eq!(config.default_retry_timeout, Duration::from_secs(15));
        assert_eq!(CacheConfig::from_env().unwrap().cache_prefix, "cb:");

        env::set_var("CIRCUIT_BREAKER_LOG_FORMAT", "json");
        assert_eq!(LogFormat::from_env().unwrap(), LogFormat::Json);
        env::set_var("CIRCUIT_BREAKER_LOG_FORMAT", "yaml");
        assert!(matches!(LogFormat::from_env(), Err(BreakerError::Config(_))));
        env::remove_var("CIRCUIT_BREAKER_LOG_FORMAT");
        assert_eq!(LogFormat::from_env().unwrap(), LogFormat::Text);

        env::set_var("CIRCUIT_BREAKER_MAX_FAILURES", "lots");
        let err = BreakerConfig::from_env().unwrap_err();
        assert!(matches!(err, BreakerError::Config(msg) if msg.contains("MAX_FAILURES")));

        env::remove_var("CIRCUIT_BREAKER_MAX_FAILURES");
        env::remove_var("CIRCUIT_BREAKER_RETRY_TIMEOUT");
        env::remove_var("CIRCUIT_BREAKER_CACHE_PREFIX");
    }
}

//! Configuration Module
//!
//! Handles loading and validating server configuration from environment
//! variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Configuration problems detected before any backend is contacted.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

// == Backend Selectors ==
/// Persistent store behind the repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataSource {
    Mysql,
    Mongo,
    #[default]
    Memory,
}

impl FromStr for DataSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(DataSource::Mysql),
            "mongo" | "mongodb" => Ok(DataSource::Mongo),
            "memory" => Ok(DataSource::Memory),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataSource::Mysql => "mysql",
            DataSource::Mongo => "mongo",
            DataSource::Memory => "memory",
        })
    }
}

/// Cache backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheProvider {
    #[default]
    Memory,
    Redis,
    None,
}

impl FromStr for CacheProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheProvider::Memory),
            "redis" => Ok(CacheProvider::Redis),
            "none" | "" => Ok(CacheProvider::None),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CacheProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheProvider::Memory => "memory",
            CacheProvider::Redis => "redis",
            CacheProvider::None => "none",
        })
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    pub data_source: DataSource,
    /// `mysql://` URL, required for `DataSource::Mysql`
    pub mysql_connection: Option<String>,
    pub mongo_uri: Option<String>,
    pub mongo_db: Option<String>,
    pub cache_provider: CacheProvider,
    pub cache_enabled: bool,
    /// `host:port` of the Redis server
    pub redis_addr: Option<String>,
    pub redis_password: Option<String>,
    /// `(token, account_id)` pairs accepted by the API
    pub auth_tokens: Vec<(String, String)>,
    pub request_timeout: Duration,
    /// Interval of the in-process cache sweeper
    pub cache_sweep_interval: Duration,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8050,
            data_source: DataSource::default(),
            mysql_connection: None,
            mongo_uri: None,
            mongo_db: None,
            cache_provider: CacheProvider::default(),
            cache_enabled: false,
            redis_addr: None,
            redis_password: None,
            auth_tokens: vec![("demo-token".to_string(), "demo-account".to_string())],
            request_timeout: Duration::from_secs(30),
            cache_sweep_interval: Duration::from_secs(60),
            debug: false,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables and validates it.
    ///
    /// # Environment Variables
    /// - `PORT` - HTTP server port (default: 8050)
    /// - `DATA_SOURCE` - `mysql`, `mongo` or `memory` (default: memory)
    /// - `MYSQL_CONNECTION` - MySQL URL
    /// - `MONGO_URI`, `MONGO_DB` - MongoDB connection string and database
    /// - `CACHE_PROVIDER` - `memory`, `redis` or `none` (default: memory)
    /// - `CACHE_ENABLED` - Enables cache-aside reads (default: false)
    /// - `REDIS_ADDR`, `REDIS_PASSWORD` - Redis server
    /// - `AUTH_TOKENS` - Comma separated `token:account_id` pairs
    /// - `REQUEST_TIMEOUT_SECS` - Per-request deadline (default: 30)
    /// - `CACHE_SWEEP_INTERVAL_SECS` - Sweeper frequency (default: 60)
    /// - `DEBUG` - Debug level logging (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_source = match non_empty("DATA_SOURCE") {
            Some(value) => value.parse::<DataSource>().map_err(|_| ConfigError::Invalid {
                key: "DATA_SOURCE",
                value,
            })?,
            None => defaults.data_source,
        };

        let cache_provider = match non_empty("CACHE_PROVIDER") {
            Some(value) => value.parse::<CacheProvider>().map_err(|_| ConfigError::Invalid {
                key: "CACHE_PROVIDER",
                value,
            })?,
            None => defaults.cache_provider,
        };

        let auth_tokens = match non_empty("AUTH_TOKENS") {
            Some(value) => parse_auth_tokens(&value)?,
            None => defaults.auth_tokens,
        };

        let config = Self {
            server_port: non_empty("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            data_source,
            mysql_connection: non_empty("MYSQL_CONNECTION"),
            mongo_uri: non_empty("MONGO_URI"),
            mongo_db: non_empty("MONGO_DB"),
            cache_provider,
            cache_enabled: non_empty("CACHE_ENABLED")
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.cache_enabled),
            redis_addr: non_empty("REDIS_ADDR"),
            redis_password: non_empty("REDIS_PASSWORD"),
            auth_tokens,
            request_timeout: non_empty("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            cache_sweep_interval: non_empty("CACHE_SWEEP_INTERVAL_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_sweep_interval),
            debug: non_empty("DEBUG").map(|v| parse_bool(&v)).unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks that the selected backends have their connection parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.data_source {
            DataSource::Mysql if self.mysql_connection.is_none() => {
                return Err(ConfigError::Missing("MYSQL_CONNECTION"));
            }
            DataSource::Mongo if self.mongo_uri.is_none() => {
                return Err(ConfigError::Missing("MONGO_URI"));
            }
            DataSource::Mongo if self.mongo_db.is_none() => {
                return Err(ConfigError::Missing("MONGO_DB"));
            }
            _ => {}
        }

        if self.cache_provider == CacheProvider::Redis && self.redis_addr.is_none() {
            return Err(ConfigError::Missing("REDIS_ADDR"));
        }

        if self.auth_tokens.is_empty() {
            return Err(ConfigError::Missing("AUTH_TOKENS"));
        }

        Ok(())
    }

    /// Connection URL for the Redis backend, if one is configured.
    pub fn redis_url(&self) -> Option<String> {
        let addr = self.redis_addr.as_deref()?;
        if addr.starts_with("redis://") || addr.starts_with("rediss://") {
            return Some(addr.to_string());
        }

        Some(match self.redis_password.as_deref() {
            Some(password) => format!("redis://:{}@{}/", password, addr),
            None => format!("redis://{}/", addr),
        })
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parses `token:account,token:account`.
fn parse_auth_tokens(value: &str) -> Result<Vec<(String, String)>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once(':') {
            Some((token, account)) if !token.trim().is_empty() && !account.trim().is_empty() => {
                Ok((token.trim().to_string(), account.trim().to_string()))
            }
            _ => Err(ConfigError::Invalid {
                key: "AUTH_TOKENS",
                value: pair.to_string(),
            }),
        })
        .collect()
}

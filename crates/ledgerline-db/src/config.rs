//! # Configuration
//!
//! Pool, cache and environment-driven settings.
//!
//! | Variable                    | Default           |
//! |-----------------------------|-------------------|
//! | `LEDGER_DATABASE_PATH`      | `./ledgerline.db` |
//! | `LEDGER_DB_MAX_CONNECTIONS` | `5`               |
//! | `LEDGER_CACHE_BACKEND`      | `memory`          |
//! | `LEDGER_REDIS_URL`          | required for `redis` |
//! | `LEDGER_CACHE_TTL_SECS`     | `1800`            |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::EXPIRY_DEFAULT_IN_MEMORY;

/// Path that selects a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Database
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/ledgerline/ledger.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or [`IN_MEMORY_PATH`].
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. Ignored in memory.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a configuration for the database file at `path`; the file is
    /// created when missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// The database lives as long as its single connection, so the pool is
    /// pinned to one connection that never idles out.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }
}

// =============================================================================
// Cache
// =============================================================================

/// Which cache backend repositories read through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKind {
    #[default]
    Memory,
    Redis,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub kind: CacheKind,

    /// Required when `kind` is [`CacheKind::Redis`].
    pub redis_url: Option<String>,

    /// Lifetime of every cache entry.
    /// Default: [`EXPIRY_DEFAULT_IN_MEMORY`]
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            kind: CacheKind::Memory,
            redis_url: None,
            default_ttl: EXPIRY_DEFAULT_IN_MEMORY,
        }
    }
}

impl CacheConfig {
    pub fn redis(url: impl Into<String>) -> Self {
        CacheConfig {
            kind: CacheKind::Redis,
            redis_url: Some(url.into()),
            ..CacheConfig::default()
        }
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

// =============================================================================
// Environment
// =============================================================================

/// Everything needed to open a [`crate::Database`].
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub database: DbConfig,
    pub cache: CacheConfig,
}

impl LedgerConfig {
    /// Loads configuration from `LEDGER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup("LEDGER_DATABASE_PATH").unwrap_or_else(|| "./ledgerline.db".to_string());

        let max_connections: u32 = lookup("LEDGER_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LEDGER_DB_MAX_CONNECTIONS".to_string()))?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue("LEDGER_DB_MAX_CONNECTIONS".to_string()));
        }

        let mut database = DbConfig::new(path).max_connections(max_connections);
        if database.is_in_memory() {
            database = DbConfig::in_memory();
        }

        let ttl_secs: u64 = lookup("LEDGER_CACHE_TTL_SECS")
            .unwrap_or_else(|| EXPIRY_DEFAULT_IN_MEMORY.as_secs().to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LEDGER_CACHE_TTL_SECS".to_string()))?;

        let kind = match lookup("LEDGER_CACHE_BACKEND").as_deref() {
            None | Some("memory") => CacheKind::Memory,
            Some("redis") => CacheKind::Redis,
            Some(_) => return Err(ConfigError::InvalidValue("LEDGER_CACHE_BACKEND".to_string())),
        };

        let redis_url = lookup("LEDGER_REDIS_URL");
        if kind == CacheKind::Redis && redis_url.is_none() {
            return Err(ConfigError::MissingRequired("LEDGER_REDIS_URL".to_string()));
        }

        Ok(LedgerConfig {
            database,
            cache: CacheConfig {
                kind,
                redis_url,
                default_ttl: Duration::from_secs(ttl_secs),
            },
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.cache.kind, CacheKind::Memory);
        assert_eq!(config.cache.default_ttl, EXPIRY_DEFAULT_IN_MEMORY);
    }

    #[test]
    fn test_redis_requires_url() {
        let err = LedgerConfig::from_lookup(lookup(&[("LEDGER_CACHE_BACKEND", "redis")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(ref v) if v == "LEDGER_REDIS_URL"));

        let config = LedgerConfig::from_lookup(lookup(&[
            ("LEDGER_CACHE_BACKEND", "redis"),
            ("LEDGER_REDIS_URL", "redis://localhost:6379"),
            ("LEDGER_CACHE_TTL_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.cache.kind, CacheKind::Redis);
        assert_eq!(config.cache.default_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_values_are_named() {
        let err = LedgerConfig::from_lookup(lookup(&[("LEDGER_DB_MAX_CONNECTIONS", "lots")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for LEDGER_DB_MAX_CONNECTIONS");

        let err = LedgerConfig::from_lookup(lookup(&[("LEDGER_CACHE_BACKEND", "memcached")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_memory_path_selects_in_memory_pool() {
        let config = LedgerConfig::from_lookup(lookup(&[("LEDGER_DATABASE_PATH", ":memory:")])).unwrap();
        assert!(config.database.is_in_memory());
        assert_eq!(config.database.max_connections, 1);
    }
}

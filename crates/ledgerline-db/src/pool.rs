//! # Database Handle
//!
//! Pool creation, the cache backend, transactions and repository access.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  LedgerConfig::from_env() / DbConfig::new(path)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::connect / Database::new  ← pool + migrations + cache         │
//! │       │                                                                 │
//! │       ├── SqlitePool        (max_connections)                           │
//! │       ├── Arc<dyn CacheBackend>  (InMemoryCache | RedisCache)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.tax_rates() / db.tasks() / db.credit_notes() / db.secrets()         │
//! │       └── Repository<E> { pool, EntityCache<E> }                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File databases run in WAL mode with NORMAL synchronous and foreign keys
//! on. In-memory databases skip WAL and pin their single connection.

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use ledgerline_core::{CoreResult, CreditNote, Secret, Task, TaxRate};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::cache::{CacheBackend, InMemoryCache, RedisCache, EXPIRY_DEFAULT_IN_MEMORY};
use crate::config::{CacheConfig, CacheKind, DbConfig, LedgerConfig};
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::Repository;

/// Future returned by a [`with_tx`] body; borrows the transaction's
/// connection for `'c`.
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = CoreResult<T>> + Send + 'c>>;

/// Runs `f` inside a transaction on `pool`.
///
/// Commits when `f` returns `Ok`, rolls back when it returns `Err` and
/// surfaces that error. The body must own what it uses:
///
/// ```rust,ignore
/// let note = note.clone();
/// with_tx(&pool, move |conn| Box::pin(async move {
///     insert(&note).execute(&mut *conn).await.map_err(..)?;
///     Ok(())
/// })).await?;
/// ```
pub async fn with_tx<T, F>(pool: &SqlitePool, f: F) -> CoreResult<T>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut SqliteConnection) -> TxFuture<'c, T> + Send,
{
    let mut tx = pool.begin().await.map_err(DbError::from)?;

    let result = f(&mut *tx).await;
    match result {
        Ok(value) => {
            tx.commit().await.map_err(DbError::from)?;
            debug!("Transaction committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            debug!(error = %err, "Transaction rolled back");
            Err(err)
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    cache: Arc<dyn CacheBackend>,
    cache_ttl: Duration,
}

impl Database {
    /// Creates the pool with an in-memory cache.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite (WAL, NORMAL synchronous, foreign keys)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let pool = connect_pool(&config).await?;

        let db = Database {
            pool,
            cache: Arc::new(InMemoryCache::new()),
            cache_ttl: EXPIRY_DEFAULT_IN_MEMORY,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Creates the pool and the configured cache backend.
    pub async fn connect(config: &LedgerConfig) -> DbResult<Self> {
        let db = Database::new(config.database.clone()).await?;
        let cache = open_cache(&config.cache).await?;
        Ok(db.with_cache(cache, config.cache.default_ttl))
    }

    /// Replaces the cache backend and entry lifetime.
    pub fn with_cache(mut self, cache: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        self.cache = cache;
        self.cache_ttl = ttl;
        self
    }

    /// Runs database migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the cache backend repositories read through.
    pub fn cache(&self) -> &Arc<dyn CacheBackend> {
        &self.cache
    }

    /// Runs `f` in a transaction; see [`with_tx`].
    pub async fn with_tx<T, F>(&self, f: F) -> CoreResult<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> TxFuture<'c, T> + Send,
    {
        with_tx(&self.pool, f).await
    }

    fn repository<E: crate::repository::Entity>(&self) -> Repository<E> {
        Repository::new(self.pool.clone(), Arc::clone(&self.cache), self.cache_ttl)
    }

    pub fn tax_rates(&self) -> Repository<TaxRate> {
        self.repository()
    }

    pub fn tasks(&self) -> Repository<Task> {
        self.repository()
    }

    pub fn credit_notes(&self) -> Repository<CreditNote> {
        self.repository()
    }

    pub fn secrets(&self) -> Repository<Secret> {
        self.repository()
    }

    /// Closes the pool; repository calls fail afterwards.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

async fn connect_pool(config: &DbConfig) -> DbResult<SqlitePool> {
    info!(
        path = %config.database_path.display(),
        "Initializing database connection"
    );

    let connect_options = if config.is_in_memory() {
        SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .foreign_keys(true)
    } else {
        SqliteConnectOptions::new()
            .filename(&config.database_path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true)
    };

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout);

    pool_options = if config.is_in_memory() {
        // Dropping the only connection drops the database.
        pool_options.idle_timeout(None).max_lifetime(None)
    } else {
        pool_options.idle_timeout(Some(config.idle_timeout))
    };

    let pool = pool_options
        .connect_with(connect_options)
        .await
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

    info!(max_connections = config.max_connections, "Database pool created");
    Ok(pool)
}

async fn open_cache(config: &CacheConfig) -> DbResult<Arc<dyn CacheBackend>> {
    match config.kind {
        CacheKind::Memory => Ok(Arc::new(InMemoryCache::new())),
        CacheKind::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| DbError::ConnectionFailed("Redis URL not configured".to_string()))?;
            Ok(Arc::new(RedisCache::connect(url).await?))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::InsertQuery;
    use ledgerline_core::{Error, ErrorKind};

    async fn scratch_table(db: &Database) {
        sqlx::query("CREATE TABLE scratch (id TEXT PRIMARY KEY NOT NULL)")
            .execute(db.pool())
            .await
            .unwrap();
    }

    async fn scratch_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM scratch")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_with_tx_commits_on_ok() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        scratch_table(&db).await;

        let inserted = db
            .with_tx(|conn| {
                Box::pin(async move {
                    for id in ["a", "b"] {
                        InsertQuery::new("scratch", &["id"], vec![id.into()])
                            .execute(&mut *conn)
                            .await
                            .map_err(|e| Error::wrap(e, ErrorKind::Database))?;
                    }
                    Ok(2)
                })
            })
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(scratch_count(&db).await, 2);
    }

    #[tokio::test]
    async fn test_with_tx_rolls_back_on_err() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        scratch_table(&db).await;

        let err = db
            .with_tx(|conn| {
                Box::pin(async move {
                    InsertQuery::new("scratch", &["id"], vec!["a".into()])
                        .execute(&mut *conn)
                        .await
                        .map_err(|e| Error::wrap(e, ErrorKind::Database))?;
                    Err::<(), _>(Error::validation("second step failed"))
                })
            })
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(scratch_count(&db).await, 0);
    }
}

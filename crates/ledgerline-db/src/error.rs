//! # Database Error Types
//!
//! Store-level errors and their classification.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreFault::classify ← NotFound / UniqueViolation / FK / Other         │
//! │       │                                                                 │
//! │       ├──► repository: entity constraint table → AlreadyExists          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (pool, migrations) ──► ledgerline_core::Error (Database)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use ledgerline_core::{Error, ErrorKind};
use thiserror::Error;

// =============================================================================
// Store Fault
// =============================================================================

/// What a failed statement means, independent of the entity involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFault {
    /// A single-row fetch found nothing.
    NotFound,

    /// A UNIQUE index rejected the row.
    ///
    /// `table` and `columns` come from SQLite's
    /// `UNIQUE constraint failed: <table>.<col>, <table>.<col>` message.
    UniqueViolation { table: String, columns: Vec<String> },

    /// A FOREIGN KEY constraint rejected the row.
    ForeignKeyViolation { message: String },

    /// Anything else.
    Other,
}

impl StoreFault {
    /// Classifies a sqlx error.
    ///
    /// ## Error Mapping
    /// ```text
    /// sqlx::Error::RowNotFound                 → NotFound
    /// Database, kind UniqueViolation           → UniqueViolation (columns parsed)
    /// Database, kind ForeignKeyViolation       → ForeignKeyViolation
    /// Database, message matches either of them → same as above
    /// Other                                    → Other
    /// ```
    pub fn classify(err: &sqlx::Error) -> StoreFault {
        match err {
            sqlx::Error::RowNotFound => StoreFault::NotFound,

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                match db_err.kind() {
                    sqlx::error::ErrorKind::UniqueViolation => parse_unique(msg),
                    sqlx::error::ErrorKind::ForeignKeyViolation => StoreFault::ForeignKeyViolation {
                        message: msg.to_string(),
                    },
                    _ if msg.contains(UNIQUE_PREFIX) => parse_unique(msg),
                    _ if msg.contains("FOREIGN KEY constraint failed") => {
                        StoreFault::ForeignKeyViolation {
                            message: msg.to_string(),
                        }
                    }
                    _ => StoreFault::Other,
                }
            }

            _ => StoreFault::Other,
        }
    }

    /// Last column of a unique violation, the one that distinguishes indexes
    /// sharing the `(tenant_id, environment_id, ...)` prefix.
    pub fn constraint_column(&self) -> Option<&str> {
        match self {
            StoreFault::UniqueViolation { columns, .. } => columns.last().map(String::as_str),
            _ => None,
        }
    }
}

const UNIQUE_PREFIX: &str = "UNIQUE constraint failed: ";

/// `UNIQUE constraint failed: tax_rates.tenant_id, tax_rates.code`
fn parse_unique(msg: &str) -> StoreFault {
    let list = msg.split(UNIQUE_PREFIX).nth(1).unwrap_or_default();
    let mut table = String::new();
    let columns = list
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('.') {
            Some((t, column)) => {
                table = t.to_string();
                column.to_string()
            }
            None => part.to_string(),
        })
        .collect();
    StoreFault::UniqueViolation { table, columns }
}

// =============================================================================
// DbError
// =============================================================================

/// Pool-level failures: connecting, migrating, raw statements.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Redis unreachable for the Redis cache backend
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Any other statement failure.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            other => DbError::QueryFailed(other),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        Error::wrap(err, ErrorKind::Database).with_hint("Database operation failed")
    }
}

/// Result type for pool-level operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

//! # ledgerline-db: Store, Cache and Repositories
//!
//! The I/O half of Ledgerline. Renders the queries composed by
//! `ledgerline-core` against SQLite, reads through a tenant-scoped cache and
//! maps store failures onto the core error taxonomy.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Ledgerline Data Flow                               │
//! │                                                                         │
//! │  Caller: db.tax_rates().list(&ctx, Some(&filter))                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                 ★ ledgerline-db (THIS CRATE) ★                  │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │ Repository<E> │    │    cache     │    │    │
//! │  │   │   (pool.rs)   │    │ tax_rate.rs   │    │ memory.rs    │    │    │
//! │  │   │               │    │ task.rs       │    │ redis.rs     │    │    │
//! │  │   │ SqlitePool    │◄───│ credit_note.rs│───►│ entity.rs    │    │    │
//! │  │   │ with_tx       │    │ secret.rs     │    │              │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  │           │                    │ sql.rs (SelectQuery)           │    │
//! │  └───────────┼────────────────────┼────────────────────────────────┘    │
//! │              ▼                    ▼                                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │   SQLite (migrations/sqlite)          Redis / in-process map    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, cache wiring and transactions
//! - [`config`] - Environment-driven configuration
//! - [`sql`] - Runtime SQL rendering of composed queries
//! - [`cache`] - Cache backends and typed entity cache
//! - [`repository`] - Generic repository and entity descriptors
//! - [`migrations`] - Embedded schema
//! - [`span`] - Tracing spans per operation
//! - [`error`] - Store fault classification
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledgerline_core::{RequestContext, TaxRate};
//! use ledgerline_db::{Database, LedgerConfig};
//!
//! let db = Database::connect(&LedgerConfig::from_env()?).await?;
//! let ctx = RequestContext::new("tenant_1").with_environment("env_live");
//!
//! let mut vat = TaxRate::percentage("tenant_1", "VAT20", "VAT", 20.0);
//! db.tax_rates().create(&ctx, &mut vat).await?;
//! let page = db.tax_rates().list(&ctx, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod span;
pub mod sql;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{CacheConfig, CacheKind, ConfigError, DbConfig, LedgerConfig};
pub use error::{DbError, DbResult, StoreFault};
pub use pool::{with_tx, Database, TxFuture};
pub use repository::{Entity, Repository, Table};

// Repository re-exports for convenience
pub use repository::credit_note::CreditNoteRepository;
pub use repository::secret::SecretRepository;
pub use repository::task::TaskRepository;
pub use repository::tax_rate::TaxRateRepository;

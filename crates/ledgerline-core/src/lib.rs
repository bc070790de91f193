//! # ledgerline-core: Query Composition for Tenant-Scoped Repositories
//!
//! The pure half of Ledgerline: filters, the query-composition pipeline, the
//! filter/sort DSL compiler, entity records and the error taxonomy. Nothing
//! in this crate performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Ledgerline Data Flow                               │
//! │                                                                         │
//! │  Caller (service layer)                                                 │
//! │       │  RequestContext + TaxRateFilter                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                ★ ledgerline-core (THIS CRATE) ★                 │    │
//! │  │                                                                 │    │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐        │    │
//! │  │   │  filter  │  │ options  │  │   dsl    │  │  error   │        │    │
//! │  │   │ contract │─►│ pipeline │─►│ compiler │  │ taxonomy │        │    │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────┘        │    │
//! │  │                      │ Query trait                              │    │
//! │  └──────────────────────┼──────────────────────────────────────────┘    │
//! │                         ▼                                               │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │        ledgerline-db (SelectQuery, cache, repositories)         │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`context`] - Tenant/environment/user of a call
//! - [`filter`] - Filter contract and entity filters
//! - [`query`] - Query capability, predicates, orderings
//! - [`options`] - Query-option strategy and the composition pipeline
//! - [`dsl`] - Filter/sort DSL compiler
//! - [`types`] - Entity records and status lifecycle
//! - [`error`] - Error kinds, hints and details
//!
//! ## Example
//!
//! ```rust
//! use ledgerline_core::filter::QueryFilter;
//! use ledgerline_core::options::apply_pagination;
//! use ledgerline_core::query::{OrderSpec, Predicate, Query};
//! use ledgerline_core::QueryOptions;
//!
//! #[derive(Default)]
//! struct Sql { limit: Option<u64> }
//!
//! impl Query for Sql {
//!     type Predicate = Predicate;
//!     type Order = OrderSpec;
//!     fn filter(self, _p: Predicate) -> Self { self }
//!     fn order_by(self, _o: OrderSpec) -> Self { self }
//!     fn limit(mut self, n: u64) -> Self { self.limit = Some(n); self }
//!     fn offset(self, _n: u64) -> Self { self }
//! }
//!
//! struct Opts;
//! impl QueryOptions<Sql> for Opts {
//!     fn entity_name(&self) -> &str { "widget" }
//!     fn field_name(&self, f: &str) -> Option<&'static str> {
//!         (f == "created_at").then_some("created_at")
//!     }
//! }
//!
//! let q = apply_pagination(Sql::default(), Some(&QueryFilter::no_limit()), &Opts);
//! assert_eq!(q.limit, None);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod context;
pub mod dsl;
pub mod error;
pub mod filter;
pub mod options;
pub mod query;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use context::RequestContext;
pub use error::{CoreResult, Error, ErrorKind};
pub use filter::{BaseFilter, ListFilter, QueryFilter, TimeRangeFilter};
pub use options::QueryOptions;
pub use query::{OrderSpec, Predicate, Query, SortDirection, Value};
pub use types::*;

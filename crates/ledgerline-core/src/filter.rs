//! # Filters
//!
//! What a caller asks a `list`/`count` for.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TaxRateFilter / TaskFilter / CreditNoteFilter / SecretFilter           │
//! │  ├── query: QueryFilter        ← status, sort, order, limit, offset     │
//! │  ├── time_range                ← created_at window                      │
//! │  ├── filters / sort            ← DSL payload (see dsl.rs)               │
//! │  └── entity fields             ← ids, codes, enums                      │
//! │                                                                         │
//! │  BaseFilter   = the contract the query pipeline reads                   │
//! │  ListFilter   = BaseFilter + DSL payload + validation                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dsl::{FilterCondition, SortCondition};
use crate::error::{CoreResult, Error};
use crate::types::{CreditNoteStatus, SecretType, TaskStatus, TaskType};

// =============================================================================
// Constants
// =============================================================================

/// Page size of [`QueryFilter::default`].
pub const DEFAULT_LIMIT: i64 = 50;

/// Largest page a caller may request.
pub const MAX_LIMIT: i64 = 1000;

/// Sort field used when the caller gives none.
pub const DEFAULT_SORT_FIELD: &str = "created_at";

pub const ORDER_ASC: &str = "asc";
pub const ORDER_DESC: &str = "desc";

// =============================================================================
// Filter Contract
// =============================================================================

/// The minimal interface the query pipeline reads from a filter.
pub trait BaseFilter {
    /// Status to match; empty means "everything except deleted".
    fn status(&self) -> &str;

    /// Logical sort field; empty means [`DEFAULT_SORT_FIELD`].
    fn sort_field(&self) -> &str;

    /// `"asc"` or anything else (descending).
    fn sort_order(&self) -> &str;

    fn limit(&self) -> i64;

    fn offset(&self) -> i64;

    /// When true, pagination is never applied.
    fn is_unlimited(&self) -> bool;
}

/// A filter a repository can list with: base contract, DSL payload, time
/// window and validation.
pub trait ListFilter: BaseFilter + Clone + Default + Send + Sync {
    fn query_filter(&self) -> &QueryFilter;

    fn query_filter_mut(&mut self) -> &mut QueryFilter;

    fn conditions(&self) -> &[FilterCondition] {
        &[]
    }

    fn sort_conditions(&self) -> &[SortCondition] {
        &[]
    }

    fn time_range(&self) -> Option<&TimeRangeFilter> {
        None
    }

    /// Validates the whole filter; every failure is a `Validation` error.
    fn validate(&self) -> CoreResult<()> {
        self.query_filter().validate()?;
        if let Some(range) = self.time_range() {
            range.validate()?;
        }
        for condition in self.conditions() {
            condition.validate()?;
        }
        for sort in self.sort_conditions() {
            sort.validate()?;
        }
        Ok(())
    }
}

// =============================================================================
// Query Filter
// =============================================================================

/// Pagination, sorting and status selection shared by every entity filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilter {
    pub status: String,
    pub sort: String,
    pub order: String,
    pub limit: i64,
    pub offset: i64,
    pub unlimited: bool,
}

impl Default for QueryFilter {
    /// First page of 50, newest first, deleted rows excluded.
    fn default() -> Self {
        QueryFilter {
            status: String::new(),
            sort: DEFAULT_SORT_FIELD.to_string(),
            order: ORDER_DESC.to_string(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            unlimited: false,
        }
    }
}

impl QueryFilter {
    /// Same as [`QueryFilter::default`] but without pagination.
    pub fn no_limit() -> Self {
        QueryFilter {
            unlimited: true,
            ..QueryFilter::default()
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.limit < 0 {
            return Err(Error::validation("limit must not be negative")
                .with_hint("Limit must be zero or a positive number")
                .with_detail("limit", self.limit));
        }
        if self.limit > MAX_LIMIT {
            return Err(Error::validation("limit too large")
                .with_hint(format!("Limit must be at most {MAX_LIMIT}"))
                .with_detail("limit", self.limit));
        }
        if self.offset < 0 {
            return Err(Error::validation("offset must not be negative")
                .with_hint("Offset must be zero or a positive number")
                .with_detail("offset", self.offset));
        }
        if !self.order.is_empty() && self.order != ORDER_ASC && self.order != ORDER_DESC {
            return Err(Error::validation("invalid sort order")
                .with_hint("Order must be 'asc' or 'desc'")
                .with_detail("order", &self.order));
        }
        Ok(())
    }
}

impl BaseFilter for QueryFilter {
    fn status(&self) -> &str {
        &self.status
    }

    fn sort_field(&self) -> &str {
        &self.sort
    }

    fn sort_order(&self) -> &str {
        &self.order
    }

    fn limit(&self) -> i64 {
        self.limit
    }

    fn offset(&self) -> i64 {
        self.offset
    }

    fn is_unlimited(&self) -> bool {
        self.unlimited
    }
}

// =============================================================================
// Time Range
// =============================================================================

/// Restricts `created_at` to `[start_time, end_time]`, either end optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRangeFilter {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl TimeRangeFilter {
    pub fn validate(&self) -> CoreResult<()> {
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start > end {
                return Err(Error::validation("start_time after end_time")
                    .with_hint("Start time must be before end time")
                    .with_detail("start_time", start.to_rfc3339())
                    .with_detail("end_time", end.to_rfc3339()));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Entity Filters
// =============================================================================

/// Implements [`BaseFilter`] and [`ListFilter`] by delegating to a `query`
/// field. Entities with a DSL payload or time window pass them by name.
macro_rules! impl_list_filter {
    ($ty:ty $(, conditions = $conditions:ident)? $(, sort = $sort:ident)? $(, time_range = $range:ident)?) => {
        impl BaseFilter for $ty {
            fn status(&self) -> &str {
                self.query.status()
            }

            fn sort_field(&self) -> &str {
                self.query.sort_field()
            }

            fn sort_order(&self) -> &str {
                self.query.sort_order()
            }

            fn limit(&self) -> i64 {
                self.query.limit()
            }

            fn offset(&self) -> i64 {
                self.query.offset()
            }

            fn is_unlimited(&self) -> bool {
                self.query.is_unlimited()
            }
        }

        impl ListFilter for $ty {
            fn query_filter(&self) -> &QueryFilter {
                &self.query
            }

            fn query_filter_mut(&mut self) -> &mut QueryFilter {
                &mut self.query
            }

            $(
                fn conditions(&self) -> &[FilterCondition] {
                    &self.$conditions
                }
            )?

            $(
                fn sort_conditions(&self) -> &[SortCondition] {
                    &self.$sort
                }
            )?

            $(
                fn time_range(&self) -> Option<&TimeRangeFilter> {
                    self.$range.as_ref()
                }
            )?
        }
    };
}

/// Filter for tax rate queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxRateFilter {
    #[serde(flatten)]
    pub query: QueryFilter,
    pub time_range: Option<TimeRangeFilter>,
    pub filters: Vec<FilterCondition>,
    /// DSL sorts; the plain `sort` field belongs to [`QueryFilter`].
    #[serde(rename = "sort_by")]
    pub sort: Vec<SortCondition>,
    pub tax_rate_ids: Vec<String>,
    pub code: Option<String>,
    pub scope: Option<String>,
}

impl_list_filter!(TaxRateFilter, conditions = filters, sort = sort, time_range = time_range);

/// Filter for task queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskFilter {
    #[serde(flatten)]
    pub query: QueryFilter,
    pub time_range: Option<TimeRangeFilter>,
    pub task_type: Option<TaskType>,
    pub entity_type: Option<String>,
    pub task_status: Option<TaskStatus>,
    pub created_by: Option<String>,
}

impl_list_filter!(TaskFilter, time_range = time_range);

/// Filter for credit note queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditNoteFilter {
    #[serde(flatten)]
    pub query: QueryFilter,
    pub time_range: Option<TimeRangeFilter>,
    pub filters: Vec<FilterCondition>,
    /// DSL sorts; the plain `sort` field belongs to [`QueryFilter`].
    #[serde(rename = "sort_by")]
    pub sort: Vec<SortCondition>,
    pub credit_note_ids: Vec<String>,
    pub invoice_id: Option<String>,
    pub customer_id: Option<String>,
    pub credit_note_status: Vec<CreditNoteStatus>,
}

impl_list_filter!(CreditNoteFilter, conditions = filters, sort = sort, time_range = time_range);

/// Filter for secret queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretFilter {
    #[serde(flatten)]
    pub query: QueryFilter,
    pub secret_type: Option<SecretType>,
    pub provider: Option<String>,
}

impl_list_filter!(SecretFilter);

// =============================================================================
// Unit Tests
// =============================================================================

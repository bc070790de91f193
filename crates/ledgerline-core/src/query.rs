//! # Query Abstraction
//!
//! A store-agnostic query capability plus the predicate/order values the
//! pipeline and the DSL compiler produce.
//!
//! ## How The Pieces Fit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   options.rs / dsl.rs                                                   │
//! │        │   build Predicate / OrderSpec (column + op + Value)           │
//! │        ▼                                                                │
//! │   Query::filter(Q::Predicate::from(p))                                  │
//! │   Query::order_by(Q::Order::from(o))                                    │
//! │   Query::limit / Query::offset                                          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   Store-native query (SelectQuery in ledgerline-db, test doubles here)  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A query type chooses its own native predicate and order types; the only
//! requirement is that they can be built from the neutral [`Predicate`] and
//! [`OrderSpec`] defined here. Every added predicate is ANDed with the
//! previous ones; order specs accumulate as a multi-key ordering, first added
//! is primary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Query Capability
// =============================================================================

/// A composable query: AND-ed predicates, ordering, limit and offset.
pub trait Query: Sized {
    /// Store-native predicate.
    type Predicate: From<Predicate>;

    /// Store-native ordering term.
    type Order: From<OrderSpec>;

    /// Adds a predicate, conjunctively.
    fn filter(self, predicate: Self::Predicate) -> Self;

    /// Appends an ordering term after the existing ones.
    fn order_by(self, order: Self::Order) -> Self;

    /// Caps the number of rows returned.
    fn limit(self, limit: u64) -> Self;

    /// Skips the first `offset` rows.
    fn offset(self, offset: u64) -> Self;
}

// =============================================================================
// Values
// =============================================================================

/// A scalar bound into a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

// =============================================================================
// Predicate
// =============================================================================

/// "column op value" in store-neutral form.
///
/// `column` is always a resolved store column, never a caller-supplied
/// logical field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Eq { column: String, value: Value },
    NotEq { column: String, value: Value },
    Gt { column: String, value: Value },
    Gte { column: String, value: Value },
    Lt { column: String, value: Value },
    Lte { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    NotIn { column: String, values: Vec<Value> },
    /// Case-insensitive substring match.
    ContainsFold { column: String, needle: String },
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn not_eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::NotEq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Gt {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Gte {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Lt {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Lte {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::NotIn {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains_fold(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Predicate::ContainsFold {
            column: column.into(),
            needle: needle.into(),
        }
    }

    /// The column this predicate constrains.
    pub fn column(&self) -> &str {
        match self {
            Predicate::Eq { column, .. }
            | Predicate::NotEq { column, .. }
            | Predicate::Gt { column, .. }
            | Predicate::Gte { column, .. }
            | Predicate::Lt { column, .. }
            | Predicate::Lte { column, .. }
            | Predicate::In { column, .. }
            | Predicate::NotIn { column, .. }
            | Predicate::ContainsFold { column, .. } => column,
        }
    }
}

// =============================================================================
// Ordering
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// `"asc"` gives ascending; anything else, including empty, descending.
    pub fn from_order(order: &str) -> Self {
        if order == crate::filter::ORDER_ASC {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// "column direction" in store-neutral form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderSpec {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        OrderSpec {
            column: column.into(),
            direction,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        OrderSpec::new(column, SortDirection::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        OrderSpec::new(column, SortDirection::Desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_exact_asc_is_ascending() {
        assert_eq!(SortDirection::from_order("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::from_order("ASC"), SortDirection::Desc);
        assert_eq!(SortDirection::from_order(""), SortDirection::Desc);
        assert_eq!(SortDirection::from_order("desc"), SortDirection::Desc);
    }

    #[test]
    fn test_predicate_column() {
        let p = Predicate::is_in("status", ["published", "archived"]);
        assert_eq!(p.column(), "status");
        assert_eq!(
            p,
            Predicate::In {
                column: "status".to_string(),
                values: vec![Value::from("published"), Value::from("archived")],
            }
        );
    }
}

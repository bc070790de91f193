//! # Filter/Sort DSL Compiler
//!
//! Compiles declarative `{field, operator, value}` and `{field, direction}`
//! clauses into predicates and orderings for any [`Query`].
//!
//! ## Compilation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  FilterCondition { field: "code", operator: in, value: ["A","B"] }      │
//! │       │                                                                 │
//! │       ▼  resolve("code") ── unknown field? ──► Validation error         │
//! │  "code"                                                                 │
//! │       │                                                                 │
//! │       ▼  operator × value ── mismatch? ──► Validation error             │
//! │  Predicate::In { column: "code", values: ["A","B"] }                    │
//! │       │                                                                 │
//! │       ▼  all clauses compiled? then, and only then                      │
//! │  query.filter(..).filter(..)    (AND)                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Compilation is pure and total: it returns either the fully composed query
//! or one error; a query is never left half-filtered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, Error};
use crate::query::{OrderSpec, Predicate, Query, SortDirection, Value};

// =============================================================================
// Clauses
// =============================================================================

/// Comparison operator of a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    #[serde(rename = "eq")]
    Equal,
    /// Case-insensitive substring.
    Contains,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "lt")]
    LessThan,
    In,
    NotIn,
    Before,
    After,
}

impl FilterOperator {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "eq",
            FilterOperator::Contains => "contains",
            FilterOperator::GreaterThan => "gt",
            FilterOperator::LessThan => "lt",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "not_in",
            FilterOperator::Before => "before",
            FilterOperator::After => "after",
        }
    }
}

/// Operand of a filter clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Array(Vec<String>),
}

/// `field operator value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        FilterCondition {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.field.is_empty() {
            return Err(Error::validation("filter field is required")
                .with_hint("Every filter condition must name a field"));
        }
        Ok(())
    }
}

/// `field direction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCondition {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortCondition {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        SortCondition {
            field: field.into(),
            direction,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.field.is_empty() {
            return Err(Error::validation("sort field is required")
                .with_hint("Every sort condition must name a field"));
        }
        Ok(())
    }
}

// =============================================================================
// Compiler
// =============================================================================

/// Compiles every filter clause, failing on the first bad one.
pub fn build_predicates<R>(filters: &[FilterCondition], resolve: R) -> CoreResult<Vec<Predicate>>
where
    R: Fn(&str) -> CoreResult<String>,
{
    filters
        .iter()
        .map(|condition| {
            let column = resolve(&condition.field)?;
            predicate_from_condition(condition, column)
        })
        .collect()
}

/// Compiles every sort clause, in order.
pub fn build_orders<R>(sort: &[SortCondition], resolve: R) -> CoreResult<Vec<OrderSpec>>
where
    R: Fn(&str) -> CoreResult<String>,
{
    sort.iter()
        .map(|s| Ok(OrderSpec::new(resolve(&s.field)?, s.direction)))
        .collect()
}

/// Compiles `filters` and ANDs them onto `query`.
pub fn apply_filters<Q, R>(query: Q, filters: &[FilterCondition], resolve: R) -> CoreResult<Q>
where
    Q: Query,
    R: Fn(&str) -> CoreResult<String>,
{
    if filters.is_empty() {
        return Ok(query);
    }
    let predicates = build_predicates(filters, resolve)?;
    Ok(predicates
        .into_iter()
        .fold(query, |q, p| q.filter(p.into())))
}

/// Compiles `sort` and appends it to `query`'s ordering.
pub fn apply_sorts<Q, R>(query: Q, sort: &[SortCondition], resolve: R) -> CoreResult<Q>
where
    Q: Query,
    R: Fn(&str) -> CoreResult<String>,
{
    if sort.is_empty() {
        return Ok(query);
    }
    let orders = build_orders(sort, resolve)?;
    Ok(orders
        .into_iter()
        .fold(query, |q, o| q.order_by(o.into())))
}

fn predicate_from_condition(condition: &FilterCondition, column: String) -> CoreResult<Predicate> {
    use FilterOperator as Op;
    use FilterValue as V;

    let predicate = match (condition.operator, &condition.value) {
        (Op::Equal, V::String(s)) => Predicate::eq(column, s.as_str()),
        (Op::Equal, V::Number(n)) => Predicate::eq(column, *n),
        (Op::Equal, V::Boolean(b)) => Predicate::eq(column, *b),
        (Op::Equal, V::Date(d)) => Predicate::eq(column, *d),
        (Op::Contains, V::String(s)) => Predicate::contains_fold(column, s.as_str()),
        (Op::GreaterThan, V::Number(n)) => Predicate::gt(column, *n),
        (Op::LessThan, V::Number(n)) => Predicate::lt(column, *n),
        (Op::In, V::Array(items)) if !items.is_empty() => {
            Predicate::In { column, values: items.iter().map(Value::from).collect() }
        }
        (Op::NotIn, V::Array(items)) if !items.is_empty() => {
            Predicate::NotIn { column, values: items.iter().map(Value::from).collect() }
        }
        (Op::Before, V::Date(d)) => Predicate::lt(column, *d),
        (Op::After, V::Date(d)) => Predicate::gt(column, *d),
        (operator, _) => {
            return Err(Error::validation(format!(
                "operator '{}' does not accept the value given for field '{}'",
                operator.as_str(),
                condition.field
            ))
            .with_hint("Check the filter operator and value type")
            .with_detail("field", &condition.field)
            .with_detail("operator", operator.as_str()));
        }
    };
    Ok(predicate)
}

// =============================================================================
// Unit Tests
// =============================================================================

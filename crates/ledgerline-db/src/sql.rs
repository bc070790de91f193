//! # SQL Rendering
//!
//! [`SelectQuery`] is the store-native [`Query`]: the pipeline and the DSL
//! compiler add predicates and orderings to it, and it renders them with
//! [`sqlx::QueryBuilder`], binding every value.
//!
//! ## Rendering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Predicate::Eq{status, "published"}   → status = ?                      │
//! │  Predicate::In{code, [A, B]}          → code IN (?, ?)                  │
//! │  Predicate::In{code, []}              → 1 = 0                           │
//! │  Predicate::NotIn{code, []}           → 1 = 1                           │
//! │  Predicate::ContainsFold{name, "Va"}  → LOWER(name) LIKE ? ESCAPE '\'   │
//! │                                          bound as %va%                  │
//! │  OrderSpec{code, Asc}                 → ORDER BY code ASC               │
//! │  offset without limit                 → LIMIT -1 OFFSET ?               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Column names are spliced into the SQL text; they only ever come from
//! entity descriptors and field resolvers, never from callers.

use chrono::{DateTime, Utc};
use ledgerline_core::query::{OrderSpec, Predicate, Query, Value};
use ledgerline_core::Status;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite};

// =============================================================================
// Bound Values
// =============================================================================

/// A nullable column value for INSERT and UPDATE statements.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Real(Option<f64>),
    Timestamp(Option<DateTime<Utc>>),
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(Some(value))
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(Some(value.to_string()))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(Some(value))
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(value: Option<i64>) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<Option<f64>> for SqlValue {
    fn from(value: Option<f64>) -> Self {
        SqlValue::Real(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(Some(value))
    }
}

impl From<Option<DateTime<Utc>>> for SqlValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<Status> for SqlValue {
    fn from(value: Status) -> Self {
        SqlValue::from(value.as_str())
    }
}

fn push_sql_value(qb: &mut QueryBuilder<'static, Sqlite>, value: &SqlValue) {
    match value {
        SqlValue::Text(v) => qb.push_bind(v.clone()),
        SqlValue::Integer(v) => qb.push_bind(*v),
        SqlValue::Real(v) => qb.push_bind(*v),
        SqlValue::Timestamp(v) => qb.push_bind(*v),
    };
}

fn push_value(qb: &mut QueryBuilder<'static, Sqlite>, value: &Value) {
    match value {
        Value::Text(v) => qb.push_bind(v.clone()),
        Value::Integer(v) => qb.push_bind(*v),
        Value::Float(v) => qb.push_bind(*v),
        Value::Bool(v) => qb.push_bind(*v),
        Value::Timestamp(v) => qb.push_bind(*v),
    };
}

/// Escapes LIKE wildcards so the needle matches literally. Only ASCII is
/// lowercased, the same as SQLite's `LOWER()`.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars().map(|c| c.to_ascii_lowercase()) {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_comparison(qb: &mut QueryBuilder<'static, Sqlite>, column: &str, op: &str, value: &Value) {
    qb.push(column).push(op);
    push_value(qb, value);
}

fn push_list(qb: &mut QueryBuilder<'static, Sqlite>, column: &str, op: &str, values: &[Value]) {
    qb.push(column).push(op).push("(");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(qb, value);
    }
    qb.push(")");
}

/// Appends ` WHERE p1 AND p2 ...`; nothing when `predicates` is empty.
fn push_where(qb: &mut QueryBuilder<'static, Sqlite>, predicates: &[Predicate]) {
    for (i, predicate) in predicates.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        match predicate {
            Predicate::Eq { column, value } => push_comparison(qb, column, " = ", value),
            Predicate::NotEq { column, value } => push_comparison(qb, column, " != ", value),
            Predicate::Gt { column, value } => push_comparison(qb, column, " > ", value),
            Predicate::Gte { column, value } => push_comparison(qb, column, " >= ", value),
            Predicate::Lt { column, value } => push_comparison(qb, column, " < ", value),
            Predicate::Lte { column, value } => push_comparison(qb, column, " <= ", value),
            Predicate::In { values, .. } if values.is_empty() => {
                qb.push("1 = 0");
            }
            Predicate::NotIn { values, .. } if values.is_empty() => {
                qb.push("1 = 1");
            }
            Predicate::In { column, values } => push_list(qb, column, " IN ", values),
            Predicate::NotIn { column, values } => push_list(qb, column, " NOT IN ", values),
            Predicate::ContainsFold { column, needle } => {
                qb.push("LOWER(")
                    .push(column)
                    .push(") LIKE ")
                    .push_bind(like_pattern(needle))
                    .push(" ESCAPE '\\'");
            }
        }
    }
}

// =============================================================================
// Select
// =============================================================================

/// A SELECT over one table.
///
/// ## Example
/// ```rust
/// use ledgerline_core::query::{OrderSpec, Predicate, Query};
/// use ledgerline_db::sql::SelectQuery;
///
/// let q = SelectQuery::new("tax_rates", &["id", "code"])
///     .filter(Predicate::eq("tenant_id", "t1"))
///     .order_by(OrderSpec::asc("code"))
///     .limit(10);
///
/// assert_eq!(
///     q.to_sql(),
///     "SELECT id, code FROM tax_rates WHERE tenant_id = ? ORDER BY code ASC LIMIT ?"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: &'static str,
    columns: &'static [&'static str],
    predicates: Vec<Predicate>,
    orders: Vec<OrderSpec>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Query for SelectQuery {
    type Predicate = Predicate;
    type Order = OrderSpec;

    fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    fn order_by(mut self, order: OrderSpec) -> Self {
        self.orders.push(order);
        self
    }

    fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl SelectQuery {
    pub fn new(table: &'static str, columns: &'static [&'static str]) -> Self {
        SelectQuery {
            table,
            columns,
            predicates: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn orders(&self) -> &[OrderSpec] {
        &self.orders
    }

    fn render(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(self.columns.join(", ")).push(" FROM ").push(self.table);
        push_where(&mut qb, &self.predicates);

        for (i, order) in self.orders.iter().enumerate() {
            qb.push(if i == 0 { " ORDER BY " } else { ", " })
                .push(&order.column)
                .push(" ")
                .push(order.direction.as_str());
        }

        match (self.limit, self.offset) {
            (Some(limit), _) => {
                qb.push(" LIMIT ").push_bind(clamp(limit));
            }
            (None, Some(_)) => {
                qb.push(" LIMIT -1");
            }
            (None, None) => {}
        }
        if let Some(offset) = self.offset {
            qb.push(" OFFSET ").push_bind(clamp(offset));
        }
        qb
    }

    fn render_count(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
        qb.push(self.table);
        push_where(&mut qb, &self.predicates);
        qb
    }

    fn render_exists(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT EXISTS(SELECT 1 FROM ");
        qb.push(self.table);
        push_where(&mut qb, &self.predicates);
        qb.push(")");
        qb
    }

    /// The rendered SQL text, placeholders included.
    pub fn to_sql(&self) -> String {
        self.render().sql().to_string()
    }

    pub async fn fetch_all<'c, T, X>(&self, executor: X) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
        X: Executor<'c, Database = Sqlite>,
    {
        let mut qb = self.render();
        qb.build_query_as::<T>().fetch_all(executor).await
    }

    pub async fn fetch_optional<'c, T, X>(&self, executor: X) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
        X: Executor<'c, Database = Sqlite>,
    {
        let mut qb = self.render();
        qb.build_query_as::<T>().fetch_optional(executor).await
    }

    /// `COUNT(*)` of the matching rows; ordering and paging are ignored.
    pub async fn count<'c, X>(&self, executor: X) -> Result<i64, sqlx::Error>
    where
        X: Executor<'c, Database = Sqlite>,
    {
        let mut qb = self.render_count();
        qb.build_query_scalar::<i64>().fetch_one(executor).await
    }

    pub async fn exists<'c, X>(&self, executor: X) -> Result<bool, sqlx::Error>
    where
        X: Executor<'c, Database = Sqlite>,
    {
        let mut qb = self.render_exists();
        qb.build_query_scalar::<bool>().fetch_one(executor).await
    }
}

/// SQLite binds integers as i64.
fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

// =============================================================================
// Insert / Update
// =============================================================================

/// `INSERT INTO table (cols) VALUES (?, ...)`.
#[derive(Debug, Clone)]
pub struct InsertQuery {
    table: &'static str,
    columns: &'static [&'static str],
    values: Vec<SqlValue>,
}

impl InsertQuery {
    /// `values` must line up with `columns`.
    pub fn new(table: &'static str, columns: &'static [&'static str], values: Vec<SqlValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len(), "column/value mismatch for {table}");
        InsertQuery { table, columns, values }
    }

    fn render(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("INSERT INTO ");
        qb.push(self.table)
            .push(" (")
            .push(self.columns.join(", "))
            .push(") VALUES (");
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_sql_value(&mut qb, value);
        }
        qb.push(")");
        qb
    }

    pub fn to_sql(&self) -> String {
        self.render().sql().to_string()
    }

    pub async fn execute<'c, X>(&self, executor: X) -> Result<u64, sqlx::Error>
    where
        X: Executor<'c, Database = Sqlite>,
    {
        let mut qb = self.render();
        Ok(qb.build().execute(executor).await?.rows_affected())
    }
}

/// `UPDATE table SET col = ?, ... WHERE ...`.
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    table: &'static str,
    assignments: Vec<(&'static str, SqlValue)>,
    predicates: Vec<Predicate>,
}

impl UpdateQuery {
    pub fn new(table: &'static str) -> Self {
        UpdateQuery {
            table,
            assignments: Vec::new(),
            predicates: Vec::new(),
        }
    }

    pub fn set(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.assignments.push((column, value.into()));
        self
    }

    pub fn set_all(mut self, assignments: Vec<(&'static str, SqlValue)>) -> Self {
        self.assignments.extend(assignments);
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn filter_all(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    fn render(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("UPDATE ");
        qb.push(self.table).push(" SET ");
        for (i, (column, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(*column).push(" = ");
            push_sql_value(&mut qb, value);
        }
        push_where(&mut qb, &self.predicates);
        qb
    }

    pub fn to_sql(&self) -> String {
        self.render().sql().to_string()
    }

    /// Runs the update, returning the number of rows it changed.
    pub async fn execute<'c, X>(&self, executor: X) -> Result<u64, sqlx::Error>
    where
        X: Executor<'c, Database = Sqlite>,
    {
        let mut qb = self.render();
        Ok(qb.build().execute(executor).await?.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["id", "name"];

    #[test]
    fn test_renders_every_predicate_shape() {
        let q = SelectQuery::new("widgets", COLUMNS)
            .filter(Predicate::eq("tenant_id", "t1"))
            .filter(Predicate::not_in("status", ["deleted"]))
            .filter(Predicate::contains_fold("name", "Va"))
            .filter(Predicate::gte("created_at", 3_i64));

        assert_eq!(
            q.to_sql(),
            "SELECT id, name FROM widgets WHERE tenant_id = ? AND status NOT IN (?) \
             AND LOWER(name) LIKE ? ESCAPE '\\' AND created_at >= ?"
        );
    }

    #[test]
    fn test_empty_lists_render_constants() {
        let q = SelectQuery::new("widgets", COLUMNS)
            .filter(Predicate::is_in("id", Vec::<String>::new()))
            .filter(Predicate::not_in("id", Vec::<String>::new()));
        assert_eq!(q.to_sql(), "SELECT id, name FROM widgets WHERE 1 = 0 AND 1 = 1");
    }

    #[test]
    fn test_order_and_paging() {
        let q = SelectQuery::new("widgets", COLUMNS)
            .order_by(OrderSpec::asc("name"))
            .order_by(OrderSpec::desc("created_at"))
            .offset(20);
        assert_eq!(
            q.to_sql(),
            "SELECT id, name FROM widgets ORDER BY name ASC, created_at DESC LIMIT -1 OFFSET ?"
        );
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_Off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_like_pattern_lowercases_ascii_only() {
        assert_eq!(like_pattern("GRÜNE Abgabe"), "%grÜne abgabe%");
    }

    #[test]
    fn test_update_rendering() {
        let q = UpdateQuery::new("widgets")
            .set("name", "new")
            .set("status", Status::Archived)
            .filter(Predicate::eq("id", "w_1"))
            .filter(Predicate::eq("status", "published"));
        assert_eq!(
            q.to_sql(),
            "UPDATE widgets SET name = ?, status = ? WHERE id = ? AND status = ?"
        );
    }

    #[test]
    fn test_insert_rendering() {
        let q = InsertQuery::new("widgets", COLUMNS, vec!["w_1".into(), "Widget".into()]);
        assert_eq!(q.to_sql(), "INSERT INTO widgets (id, name) VALUES (?, ?)");
    }
}

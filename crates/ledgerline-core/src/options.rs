//! # Query-Option Strategy & Composition Pipeline
//!
//! Every `list` and `count` goes through the same fixed pipeline so that no
//! entity can forget its tenant predicate.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  apply_query_options(ctx, query, filter, opts)                          │
//! │   │                                                                     │
//! │   ├─ apply_base_filters      ALWAYS, all three together                 │
//! │   │    ├─ tenant_id = ctx.tenant                                        │
//! │   │    ├─ status = filter.status  (empty → status NOT IN ('deleted'))   │
//! │   │    └─ environment_id = ctx.environment   (when present)             │
//! │   │                                                                     │
//! │   ├─ apply_sorting           only with a filter                         │
//! │   │    └─ field_name(filter.sort) ASC if order == "asc" else DESC       │
//! │   │                                                                     │
//! │   └─ apply_pagination        only with a limited filter and limit > 0   │
//! │        ├─ LIMIT filter.limit                                            │
//! │        └─ OFFSET filter.offset   (only when > 0)                        │
//! │                                                                         │
//! │  count = apply_base_filters + entity predicates (no sort, no paging)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The three base predicates are independent conjuncts, so their relative
//! order does not change the result set.

use crate::context::RequestContext;
use crate::error::{CoreResult, Error};
use crate::filter::{BaseFilter, DEFAULT_SORT_FIELD};
use crate::query::{OrderSpec, Predicate, Query, SortDirection};
use crate::types::Status;

/// Column holding the owning tenant.
pub const TENANT_COLUMN: &str = "tenant_id";

/// Column holding the owning environment.
pub const ENVIRONMENT_COLUMN: &str = "environment_id";

/// Column holding the lifecycle status.
pub const STATUS_COLUMN: &str = "status";

// =============================================================================
// Strategy
// =============================================================================

/// Per-entity query strategy.
///
/// Only [`QueryOptions::field_name`] is entity specific; the remaining
/// methods have defaults built on the standard column names and can be
/// overridden by entities that store scope differently.
pub trait QueryOptions<Q: Query> {
    /// Name used in error messages, e.g. `"tax rate"`.
    fn entity_name(&self) -> &str;

    /// Maps a logical field to its store column; `None` when the field is
    /// not queryable.
    fn field_name(&self, field: &str) -> Option<&'static str>;

    /// [`QueryOptions::field_name`] as a `Validation` failure naming the field.
    fn resolve_field(&self, field: &str) -> CoreResult<String> {
        self.field_name(field).map(str::to_string).ok_or_else(|| {
            Error::validation(format!(
                "unknown field name '{}' in {} query",
                field,
                self.entity_name()
            ))
            .with_hint(format!("'{field}' cannot be used to filter or sort"))
            .with_detail("field", field)
        })
    }

    fn apply_tenant_filter(&self, ctx: &RequestContext, query: Q) -> Q {
        query.filter(Predicate::eq(TENANT_COLUMN, ctx.tenant_id()).into())
    }

    fn apply_environment_filter(&self, ctx: &RequestContext, query: Q) -> Q {
        match ctx.environment_id() {
            Some(environment_id) => query.filter(Predicate::eq(ENVIRONMENT_COLUMN, environment_id).into()),
            None => query,
        }
    }

    fn apply_status_filter(&self, query: Q, status: &str) -> Q {
        if status.is_empty() {
            query.filter(Predicate::not_in(STATUS_COLUMN, [Status::Deleted.as_str()]).into())
        } else {
            query.filter(Predicate::eq(STATUS_COLUMN, status).into())
        }
    }

    fn apply_sort_filter(&self, query: Q, field: &str, order: &str) -> CoreResult<Q> {
        let column = self.resolve_field(field)?;
        let spec = OrderSpec::new(column, SortDirection::from_order(order));
        Ok(query.order_by(spec.into()))
    }

    fn apply_pagination_filter(&self, query: Q, limit: u64, offset: u64) -> Q {
        let query = query.limit(limit);
        if offset > 0 {
            query.offset(offset)
        } else {
            query
        }
    }
}

// =============================================================================
// Composition
// =============================================================================

/// Tenant, status and environment predicates, always together.
pub fn apply_base_filters<Q, F, S>(ctx: &RequestContext, query: Q, filter: Option<&F>, opts: &S) -> Q
where
    Q: Query,
    F: BaseFilter + ?Sized,
    S: QueryOptions<Q> + ?Sized,
{
    let query = opts.apply_tenant_filter(ctx, query);
    let status = filter.map(|f| f.status()).unwrap_or_default();
    let query = opts.apply_status_filter(query, status);
    opts.apply_environment_filter(ctx, query)
}

/// Orders by the filter's sort field, or `created_at desc` without a filter.
///
/// An empty sort field falls back to `created_at`; a field the strategy does
/// not know is a `Validation` error.
pub fn apply_sorting<Q, F, S>(query: Q, filter: Option<&F>, opts: &S) -> CoreResult<Q>
where
    Q: Query,
    F: BaseFilter + ?Sized,
    S: QueryOptions<Q> + ?Sized,
{
    match filter {
        None => Ok(query.order_by(OrderSpec::desc(DEFAULT_SORT_FIELD).into())),
        Some(f) => {
            let field = match f.sort_field() {
                "" => DEFAULT_SORT_FIELD,
                field => field,
            };
            opts.apply_sort_filter(query, field, f.sort_order())
        }
    }
}

/// Limit/offset, skipped without a filter, for unlimited filters, and for a
/// non-positive limit.
pub fn apply_pagination<Q, F, S>(query: Q, filter: Option<&F>, opts: &S) -> Q
where
    Q: Query,
    F: BaseFilter + ?Sized,
    S: QueryOptions<Q> + ?Sized,
{
    match filter {
        Some(f) if !f.is_unlimited() && f.limit() > 0 => {
            let offset = u64::try_from(f.offset()).unwrap_or(0);
            opts.apply_pagination_filter(query, f.limit() as u64, offset)
        }
        _ => query,
    }
}

/// The single entry point every `list` uses: base filters, then sorting and
/// pagination when a filter is given.
pub fn apply_query_options<Q, F, S>(
    ctx: &RequestContext,
    query: Q,
    filter: Option<&F>,
    opts: &S,
) -> CoreResult<Q>
where
    Q: Query,
    F: BaseFilter + ?Sized,
    S: QueryOptions<Q> + ?Sized,
{
    let query = apply_base_filters(ctx, query, filter, opts);
    if filter.is_none() {
        return Ok(query);
    }
    let query = apply_sorting(query, filter, opts)?;
    Ok(apply_pagination(query, filter, opts))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::QueryFilter;
    use crate::query::Value;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Where(Predicate),
        Order(OrderSpec),
        Limit(u64),
        Offset(u64),
    }

    /// A query that only records the operations applied to it.
    #[derive(Debug, Default, Clone, PartialEq)]
    struct Recording(Vec<Op>);

    impl Recording {
        fn predicates(&self) -> Vec<&Predicate> {
            self.0
                .iter()
                .filter_map(|op| match op {
                    Op::Where(p) => Some(p),
                    _ => None,
                })
                .collect()
        }

        fn has_paging(&self) -> bool {
            self.0.iter().any(|op| matches!(op, Op::Limit(_) | Op::Offset(_)))
        }
    }

    impl Query for Recording {
        type Predicate = Predicate;
        type Order = OrderSpec;

        fn filter(mut self, predicate: Predicate) -> Self {
            self.0.push(Op::Where(predicate));
            self
        }

        fn order_by(mut self, order: OrderSpec) -> Self {
            self.0.push(Op::Order(order));
            self
        }

        fn limit(mut self, limit: u64) -> Self {
            self.0.push(Op::Limit(limit));
            self
        }

        fn offset(mut self, offset: u64) -> Self {
            self.0.push(Op::Offset(offset));
            self
        }
    }

    struct WidgetOptions;

    impl QueryOptions<Recording> for WidgetOptions {
        fn entity_name(&self) -> &str {
            "widget"
        }

        fn field_name(&self, field: &str) -> Option<&'static str> {
            match field {
                "created_at" => Some("created_at"),
                "updated_at" => Some("updated_at"),
                "name" => Some("widget_name"),
                _ => None,
            }
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new("t1").with_environment("e1")
    }

    #[test]
    fn test_base_filters_apply_all_three() {
        let q = apply_base_filters(&ctx(), Recording::default(), None::<&QueryFilter>, &WidgetOptions);

        assert_eq!(
            q.predicates(),
            vec![
                &Predicate::eq("tenant_id", "t1"),
                &Predicate::not_in("status", ["deleted"]),
                &Predicate::eq("environment_id", "e1"),
            ]
        );
    }

    #[test]
    fn test_explicit_status_is_matched_exactly() {
        let filter = QueryFilter {
            status: "archived".to_string(),
            ..QueryFilter::default()
        };
        let q = apply_base_filters(&ctx(), Recording::default(), Some(&filter), &WidgetOptions);
        assert!(q.predicates().contains(&&Predicate::eq("status", "archived")));
    }

    #[test]
    fn test_environment_skipped_when_absent() {
        let ctx = RequestContext::new("t1");
        let q = apply_base_filters(&ctx, Recording::default(), None::<&QueryFilter>, &WidgetOptions);
        assert!(q.predicates().iter().all(|p| p.column() != "environment_id"));
        assert_eq!(q.predicates().len(), 2);
    }

    #[test]
    fn test_sorting_without_filter_defaults_to_created_at_desc() {
        let q = apply_sorting(Recording::default(), None::<&QueryFilter>, &WidgetOptions).unwrap();
        assert_eq!(q.0, vec![Op::Order(OrderSpec::desc("created_at"))]);
    }

    #[test]
    fn test_sorting_translates_field_and_only_exact_asc_ascends() {
        let mut filter = QueryFilter {
            sort: "name".to_string(),
            order: "asc".to_string(),
            ..QueryFilter::default()
        };
        let q = apply_sorting(Recording::default(), Some(&filter), &WidgetOptions).unwrap();
        assert_eq!(q.0, vec![Op::Order(OrderSpec::asc("widget_name"))]);

        filter.order = String::new();
        let q = apply_sorting(Recording::default(), Some(&filter), &WidgetOptions).unwrap();
        assert_eq!(q.0, vec![Op::Order(OrderSpec::desc("widget_name"))]);
    }

    #[test]
    fn test_sorting_empty_field_falls_back_and_unknown_field_fails() {
        let mut filter = QueryFilter {
            sort: String::new(),
            ..QueryFilter::default()
        };
        let q = apply_sorting(Recording::default(), Some(&filter), &WidgetOptions).unwrap();
        assert_eq!(q.0, vec![Op::Order(OrderSpec::desc("created_at"))]);

        filter.sort = "id; DROP TABLE widgets".to_string();
        let err = apply_sorting(Recording::default(), Some(&filter), &WidgetOptions).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.details()["field"], "id; DROP TABLE widgets");
    }

    #[test]
    fn test_pagination_applies_limit_and_positive_offset_only() {
        let mut filter = QueryFilter {
            limit: 10,
            offset: 0,
            ..QueryFilter::default()
        };
        let q = apply_pagination(Recording::default(), Some(&filter), &WidgetOptions);
        assert_eq!(q.0, vec![Op::Limit(10)]);

        filter.offset = 20;
        let q = apply_pagination(Recording::default(), Some(&filter), &WidgetOptions);
        assert_eq!(q.0, vec![Op::Limit(10), Op::Offset(20)]);
    }

    #[test]
    fn test_unlimited_bypasses_pagination_for_any_numbers() {
        for (limit, offset) in [(0, 0), (1, 0), (10, 5), (1000, 999), (-3, -3)] {
            let filter = QueryFilter {
                limit,
                offset,
                unlimited: true,
                ..QueryFilter::default()
            };
            let q = apply_pagination(Recording::default(), Some(&filter), &WidgetOptions);
            assert!(!q.has_paging(), "limit={limit} offset={offset}");
        }
    }

    #[test]
    fn test_no_pagination_without_filter_or_positive_limit() {
        let q = apply_pagination(Recording::default(), None::<&QueryFilter>, &WidgetOptions);
        assert!(!q.has_paging());

        let filter = QueryFilter {
            limit: 0,
            offset: 30,
            ..QueryFilter::default()
        };
        let q = apply_pagination(Recording::default(), Some(&filter), &WidgetOptions);
        assert!(!q.has_paging());
    }

    #[test]
    fn test_query_options_equals_manual_composition() {
        let filter = QueryFilter {
            sort: "updated_at".to_string(),
            order: "asc".to_string(),
            limit: 25,
            offset: 50,
            ..QueryFilter::default()
        };
        let ctx = ctx();

        let composed = apply_query_options(&ctx, Recording::default(), Some(&filter), &WidgetOptions).unwrap();

        let manual = WidgetOptions.apply_tenant_filter(&ctx, Recording::default());
        let manual = WidgetOptions.apply_status_filter(manual, "");
        let manual = WidgetOptions.apply_environment_filter(&ctx, manual);
        let manual = WidgetOptions.apply_sort_filter(manual, "updated_at", "asc").unwrap();
        let manual = WidgetOptions.apply_pagination_filter(manual, 25, 50);

        assert_eq!(composed, manual);
    }

    #[test]
    fn test_base_filter_order_is_irrelevant() {
        let ctx = ctx();
        let forward = apply_base_filters(&ctx, Recording::default(), None::<&QueryFilter>, &WidgetOptions);

        let reversed = WidgetOptions.apply_environment_filter(&ctx, Recording::default());
        let reversed = WidgetOptions.apply_status_filter(reversed, "");
        let reversed = WidgetOptions.apply_tenant_filter(&ctx, reversed);

        let mut a: Vec<String> = forward.predicates().iter().map(|p| format!("{p:?}")).collect();
        let mut b: Vec<String> = reversed.predicates().iter().map(|p| format!("{p:?}")).collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_query_options_without_filter_only_scopes() {
        let q = apply_query_options(&ctx(), Recording::default(), None::<&QueryFilter>, &WidgetOptions).unwrap();
        assert_eq!(q.0.len(), 3);
        assert!(q.0.iter().all(|op| matches!(op, Op::Where(_))));
        assert!(matches!(
            &q.0[0],
            Op::Where(Predicate::Eq { value: Value::Text(t), .. }) if t == "t1"
        ));
    }
}

//! # Repositories
//!
//! One generic [`Repository`] serves every entity; what differs per entity
//! lives in its [`Entity`] descriptor: table and columns, field resolver,
//! constraint table, cache prefix, update guard, alternate lookup key and
//! child tables.
//!
//! ## Operation Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create   tenant check → fill environment → INSERT → constraint table   │
//! │  get      cache(id) ─ miss ─► SELECT scoped by tenant/env ─► populate   │
//! │  list     entity predicates → DSL filters → DSL sorts (primary)         │
//! │           → apply_query_options (base filters, sort, pagination)        │
//! │  count    entity predicates → DSL filters → base filters                │
//! │  update   UPDATE ... WHERE id, tenant, env [, status = guard]           │
//! │           0 rows → existence check → NotFound (+ precondition detail)   │
//! │  delete   same guard, status = deleted, children in one transaction     │
//! │                                                                         │
//! │  update/delete drop every cache key of the row on every outcome         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cache entries are written under the row's own tenant/environment. Reads
//! probe with the caller's scope, so a caller without an environment only
//! hits entries of rows without one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ledgerline_core::dsl::{apply_filters, apply_sorts};
use ledgerline_core::options::{apply_base_filters, apply_query_options, ENVIRONMENT_COLUMN, TENANT_COLUMN};
use ledgerline_core::query::{Predicate, Query};
use ledgerline_core::{CoreResult, Error, ErrorKind, ListFilter, QueryOptions, Record, RequestContext, Status};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::cache::{CacheBackend, EntityCache};
use crate::error::StoreFault;
use crate::pool::with_tx;
use crate::span::traced;
use crate::sql::{InsertQuery, SelectQuery, SqlValue, UpdateQuery};

pub mod credit_note;
pub mod secret;
pub mod task;
pub mod tax_rate;

pub const ID_COLUMN: &str = "id";
pub const STATUS_COLUMN: &str = "status";
pub const CREATED_AT_COLUMN: &str = "created_at";
pub const UPDATED_AT_COLUMN: &str = "updated_at";
pub const UPDATED_BY_COLUMN: &str = "updated_by";

// =============================================================================
// Descriptors
// =============================================================================

/// Maps the unique index ending in `column` to an error.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintRule {
    pub column: &'static str,
    pub kind: ErrorKind,
    pub hint: &'static str,
}

impl ConstraintRule {
    pub const fn already_exists(column: &'static str, hint: &'static str) -> Self {
        ConstraintRule {
            column,
            kind: ErrorKind::AlreadyExists,
            hint,
        }
    }
}

/// Whose rows an alternate lookup key is unique among.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupScope {
    /// Unique per tenant and environment.
    Tenant,
    /// Unique across tenants; cached without a scope.
    Global,
}

/// A natural key a row can be read by besides its id.
#[derive(Debug, Clone, Copy)]
pub struct Lookup {
    pub column: &'static str,
    pub scope: LookupScope,
}

/// Rows soft-deleted together with their parent.
#[derive(Debug, Clone, Copy)]
pub struct ChildTable {
    pub table: &'static str,
    pub parent_column: &'static str,
}

/// A row type the store can insert.
pub trait Table: Record + for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;

    /// Every column, in [`Table::values`] order.
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<SqlValue>;

    fn insert_query(&self) -> InsertQuery {
        InsertQuery::new(Self::TABLE, Self::COLUMNS, self.values())
    }
}

/// Everything the generic repository needs to know about an entity.
pub trait Entity: Table + Clone + Serialize + DeserializeOwned {
    type Filter: ListFilter;

    /// Human name, e.g. `"tax rate"`.
    const NAME: &'static str;

    /// Detail key carrying the id in errors, e.g. `"tax_rate_id"`.
    const ID_DETAIL: &'static str;

    const CACHE_PREFIX: &'static str;

    const CONSTRAINTS: &'static [ConstraintRule] = &[];

    /// Status a row must still have for `update`/`delete` to apply.
    const UPDATE_GUARD: Option<Status> = None;

    const LOOKUP: Option<Lookup> = None;

    const CHILDREN: &'static [ChildTable] = &[];

    /// Logical field → column; `None` for fields callers may not query.
    fn field_name(field: &str) -> Option<&'static str>;

    /// Columns `update` writes, `updated_at`/`updated_by` included.
    fn update_values(&self) -> Vec<(&'static str, SqlValue)>;

    /// Predicates for the entity-specific fields of `filter`.
    fn filter_predicates(_filter: &Self::Filter) -> Vec<Predicate> {
        Vec::new()
    }

    /// Value of the [`Entity::LOOKUP`] column.
    fn lookup_value(&self) -> Option<&str> {
        None
    }
}

// =============================================================================
// Errors
// =============================================================================

fn title(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn not_found<E: Entity>(id: &str) -> Error {
    Error::not_found(format!("{} not found", E::NAME))
        .with_hint(format!("{} with ID {} was not found", title(E::NAME), id))
        .with_detail(E::ID_DETAIL, id)
}

pub(crate) fn read_error<E: Entity>(err: sqlx::Error, operation: &str) -> Error {
    Error::wrap(err, ErrorKind::Database).with_hint(format!("Failed to {} {}", operation, E::NAME))
}

/// Classifies a failed write through the entity's constraint table.
pub(crate) fn write_error<E: Entity>(err: sqlx::Error, operation: &str) -> Error {
    let fault = StoreFault::classify(&err);
    let Some(column) = fault.constraint_column() else {
        return read_error::<E>(err, operation);
    };
    let column = column.to_string();
    match E::CONSTRAINTS.iter().find(|rule| rule.column == column) {
        Some(rule) => Error::wrap(err, rule.kind).with_hint(rule.hint),
        None => Error::wrap(err, ErrorKind::AlreadyExists)
            .with_hint(format!("A {} with these values already exists", E::NAME)),
    }
    .with_detail("constraint", column)
}

/// Tenant and environment predicates of `ctx`.
pub(crate) fn scope_predicates(ctx: &RequestContext) -> Vec<Predicate> {
    let mut predicates = vec![Predicate::eq(TENANT_COLUMN, ctx.tenant_id())];
    if let Some(environment_id) = ctx.environment_id() {
        predicates.push(Predicate::eq(ENVIRONMENT_COLUMN, environment_id));
    }
    predicates
}

/// Whether a cached lookup hit is one the store query would have returned
/// to `ctx`. Global keys are shared by every tenant.
fn lookup_hit_visible<R: Record>(ctx: &RequestContext, scope: LookupScope, hit: &R) -> bool {
    if hit.status() == Status::Deleted {
        return false;
    }
    if !ctx.tenant_id().is_empty() && hit.tenant_id() != ctx.tenant_id() {
        return false;
    }
    match (scope, ctx.environment_id()) {
        (LookupScope::Tenant, Some(environment_id)) => hit.environment_id() == environment_id,
        _ => true,
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Tenant-scoped, cache-aside repository for `E`.
///
/// ## Usage
/// ```rust,ignore
/// let ctx = RequestContext::new("tenant_1").with_environment("env_live");
/// let rates = db.tax_rates();
///
/// rates.create(&ctx, &mut rate).await?;
/// let rate = rates.get(&ctx, &rate.id).await?;
/// let page = rates.list(&ctx, Some(&TaxRateFilter::default())).await?;
/// ```
pub struct Repository<E> {
    pool: SqlitePool,
    cache: EntityCache<E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Repository {
            pool: self.pool.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<E: Entity> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &E::NAME)
            .field("cache", &self.cache)
            .finish()
    }
}

impl<E: Entity> QueryOptions<SelectQuery> for Repository<E> {
    fn entity_name(&self) -> &str {
        E::NAME
    }

    fn field_name(&self, field: &str) -> Option<&'static str> {
        E::field_name(field)
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(pool: SqlitePool, cache: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Repository {
            pool,
            cache: EntityCache::new(cache, E::CACHE_PREFIX, ttl),
        }
    }

    pub fn cache(&self) -> &EntityCache<E> {
        &self.cache
    }

    // =========================================================================
    // Public operations
    // =========================================================================

    /// Inserts `entity`, filling its environment from `ctx` when empty.
    ///
    /// ## Errors
    /// * `Validation` - `entity` belongs to another tenant
    /// * `AlreadyExists` - a unique index rejected the row
    /// * `Database` - any other store failure
    pub async fn create(&self, ctx: &RequestContext, entity: &mut E) -> CoreResult<()> {
        traced(E::NAME, "create", self.create_inner(ctx, entity)).await
    }

    /// Reads one row by id, through the cache.
    pub async fn get(&self, ctx: &RequestContext, id: &str) -> CoreResult<E> {
        traced(E::NAME, "get", self.get_inner(ctx, id)).await
    }

    /// Reads one non-deleted row by its alternate lookup key, through the
    /// cache. `Validation` for entities without one.
    pub async fn get_by_lookup(&self, ctx: &RequestContext, value: &str) -> CoreResult<E> {
        traced(E::NAME, "get_by_lookup", async {
            let lookup = E::LOOKUP.ok_or_else(|| {
                Error::validation(format!("{} has no lookup key", E::NAME))
                    .with_hint(format!("{} can only be read by ID", title(E::NAME)))
            })?;
            self.lookup(ctx, lookup, value, Vec::new(), |_: &E| true)
                .await?
                .ok_or_else(|| {
                    Error::not_found(format!("{} not found", E::NAME))
                        .with_hint(format!("{} with {} {} was not found", title(E::NAME), lookup.column, value))
                        .with_detail(lookup.column, value)
                })
        })
        .await
    }

    /// One page of rows. `None` means [`ListFilter::default`]: first page,
    /// newest first, deleted rows excluded.
    pub async fn list(&self, ctx: &RequestContext, filter: Option<&E::Filter>) -> CoreResult<Vec<E>> {
        let filter = filter.cloned().unwrap_or_default();
        traced(E::NAME, "list", self.list_inner(ctx, filter)).await
    }

    /// Every matching row; pagination is never applied.
    pub async fn list_all(&self, ctx: &RequestContext, filter: Option<&E::Filter>) -> CoreResult<Vec<E>> {
        let mut filter = filter.cloned().unwrap_or_default();
        filter.query_filter_mut().unlimited = true;
        traced(E::NAME, "list_all", self.list_inner(ctx, filter)).await
    }

    /// Number of matching rows, ignoring sort and pagination.
    pub async fn count(&self, ctx: &RequestContext, filter: Option<&E::Filter>) -> CoreResult<i64> {
        let filter = filter.cloned().unwrap_or_default();
        traced(E::NAME, "count", self.count_inner(ctx, filter)).await
    }

    /// Whether a non-deleted row with `id` exists in the caller's scope.
    pub async fn exists(&self, ctx: &RequestContext, id: &str) -> CoreResult<bool> {
        traced(E::NAME, "exists", async {
            self.scoped(ctx, self.select())
                .filter(Predicate::eq(ID_COLUMN, id))
                .filter(Predicate::not_in(STATUS_COLUMN, [Status::Deleted.as_str()]))
                .exists(&self.pool)
                .await
                .map_err(|e| read_error::<E>(e, "check"))
        })
        .await
    }

    /// Writes the mutable columns of `entity`, stamping `updated_at/by`.
    ///
    /// Guarded entities only update a row still in their guard status. When
    /// nothing was updated the error is `NotFound`; a row that exists but
    /// failed the guard carries `precondition_failed = true`.
    pub async fn update(&self, ctx: &RequestContext, entity: &mut E) -> CoreResult<()> {
        traced(E::NAME, "update", self.update_inner(ctx, entity)).await
    }

    /// Soft-deletes the row (and its child rows) in one transaction.
    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> CoreResult<()> {
        traced(E::NAME, "delete", self.delete_inner(ctx, id)).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn select(&self) -> SelectQuery {
        SelectQuery::new(E::TABLE, E::COLUMNS)
    }

    fn scoped(&self, ctx: &RequestContext, query: SelectQuery) -> SelectQuery {
        let query = self.apply_tenant_filter(ctx, query);
        self.apply_environment_filter(ctx, query)
    }

    fn id_key(&self, ctx: &RequestContext, id: &str) -> String {
        self.cache.key(ctx.tenant_id(), ctx.environment_id().unwrap_or_default(), id)
    }

    fn lookup_cache_key(&self, lookup: Lookup, tenant_id: &str, environment_id: &str, value: &str) -> String {
        match lookup.scope {
            LookupScope::Tenant => self.cache.lookup_key(lookup.column, tenant_id, environment_id, value),
            LookupScope::Global => self.cache.lookup_key(lookup.column, "", "", value),
        }
    }

    /// Every cache key `entity` may be stored under.
    fn entity_keys(&self, entity: &E) -> Vec<String> {
        let mut keys = vec![self.cache.key(entity.tenant_id(), entity.environment_id(), entity.id())];
        if let (Some(lookup), Some(value)) = (E::LOOKUP, entity.lookup_value()) {
            keys.push(self.lookup_cache_key(lookup, entity.tenant_id(), entity.environment_id(), value));
        }
        keys
    }

    async fn populate(&self, entity: &E) {
        for key in self.entity_keys(entity) {
            self.cache.set(&key, entity).await;
        }
    }

    /// Reads a row straight from the store, bypassing the cache.
    async fn fetch_scoped(&self, ctx: &RequestContext, id: &str) -> CoreResult<Option<E>> {
        self.scoped(ctx, self.select())
            .filter(Predicate::eq(ID_COLUMN, id))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| read_error::<E>(e, "get"))
    }

    /// Keys to drop before mutating the row `id`: those of its current
    /// stored version, or the caller-scope id key when it is absent.
    async fn keys_before_write(&self, ctx: &RequestContext, id: &str) -> CoreResult<Vec<String>> {
        Ok(match self.fetch_scoped(ctx, id).await? {
            Some(current) => self.entity_keys(&current),
            None => vec![self.id_key(ctx, id)],
        })
    }

    async fn create_inner(&self, ctx: &RequestContext, entity: &mut E) -> CoreResult<()> {
        self.prepare_create(ctx, entity)?;
        debug!(tenant_id = ctx.tenant_id(), id = entity.id(), "Creating {}", E::NAME);

        entity
            .insert_query()
            .execute(&self.pool)
            .await
            .map_err(|e| write_error::<E>(e, "create"))?;
        Ok(())
    }

    fn prepare_create<R: Record>(&self, ctx: &RequestContext, record: &mut R) -> CoreResult<()> {
        if record.tenant_id() != ctx.tenant_id() {
            return Err(Error::validation(format!("{} belongs to another tenant", E::NAME))
                .with_hint("Records can only be created for the calling tenant")
                .with_detail("tenant_id", record.tenant_id()));
        }
        if record.environment_id().is_empty() {
            if let Some(environment_id) = ctx.environment_id() {
                record.set_environment_id(environment_id.to_string());
            }
        }
        record.stamp_created(ctx.user_id());
        Ok(())
    }

    async fn get_inner(&self, ctx: &RequestContext, id: &str) -> CoreResult<E> {
        if let Some(hit) = self.cache.get(&self.id_key(ctx, id)).await {
            return Ok(hit);
        }

        let entity = self.fetch_scoped(ctx, id).await?.ok_or_else(|| not_found::<E>(id))?;
        self.populate(&entity).await;
        Ok(entity)
    }

    /// Cache-aside read by the lookup column. `accept` rejects cache hits
    /// that `extra` would have filtered out of the store query; hits outside
    /// the caller's scope or already deleted are rejected for every caller.
    async fn lookup<A>(
        &self,
        ctx: &RequestContext,
        lookup: Lookup,
        value: &str,
        extra: Vec<Predicate>,
        accept: A,
    ) -> CoreResult<Option<E>>
    where
        A: Fn(&E) -> bool,
    {
        let key = self.lookup_cache_key(
            lookup,
            ctx.tenant_id(),
            ctx.environment_id().unwrap_or_default(),
            value,
        );
        if let Some(hit) = self.cache.get(&key).await {
            if lookup_hit_visible(ctx, lookup.scope, &hit) && accept(&hit) {
                return Ok(Some(hit));
            }
        }

        let mut query = self.select().filter(Predicate::eq(lookup.column, value));
        query = match lookup.scope {
            LookupScope::Tenant => self.scoped(ctx, query),
            // Global keys resolve the tenant; narrow by it only when known.
            LookupScope::Global if ctx.tenant_id().is_empty() => query,
            LookupScope::Global => self.apply_tenant_filter(ctx, query),
        };
        query = self.apply_status_filter(query, "");
        query = extra.into_iter().fold(query, Query::filter);

        let found: Option<E> = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| read_error::<E>(e, "get"))?;
        if let Some(entity) = &found {
            self.populate(entity).await;
        }
        Ok(found)
    }

    /// Entity predicates, time window and DSL filters of `filter`.
    fn filtered(&self, filter: &E::Filter) -> CoreResult<SelectQuery> {
        let mut query = E::filter_predicates(filter)
            .into_iter()
            .fold(self.select(), Query::filter);

        if let Some(range) = filter.time_range() {
            if let Some(start) = range.start_time {
                query = query.filter(Predicate::gte(CREATED_AT_COLUMN, start));
            }
            if let Some(end) = range.end_time {
                query = query.filter(Predicate::lte(CREATED_AT_COLUMN, end));
            }
        }

        apply_filters(query, filter.conditions(), |field| self.resolve_field(field))
    }

    async fn list_inner(&self, ctx: &RequestContext, filter: E::Filter) -> CoreResult<Vec<E>> {
        filter.validate()?;

        let query = self.filtered(&filter)?;
        let query = apply_sorts(query, filter.sort_conditions(), |field| self.resolve_field(field))?;
        let query = apply_query_options(ctx, query, Some(&filter), self)?;

        let rows: Vec<E> = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| read_error::<E>(e, "list"))?;
        debug!(tenant_id = ctx.tenant_id(), count = rows.len(), "Listed {}", E::NAME);
        Ok(rows)
    }

    async fn count_inner(&self, ctx: &RequestContext, filter: E::Filter) -> CoreResult<i64> {
        filter.validate()?;

        let query = self.filtered(&filter)?;
        let query = apply_base_filters(ctx, query, Some(&filter), self);

        query.count(&self.pool).await.map_err(|e| read_error::<E>(e, "count"))
    }

    async fn update_inner(&self, ctx: &RequestContext, entity: &mut E) -> CoreResult<()> {
        let mut keys = self.entity_keys(entity);
        if E::LOOKUP.is_some() {
            // The stored lookup value may differ from the one being written.
            keys.extend(self.keys_before_write(ctx, entity.id()).await?);
        }

        entity.stamp_updated(ctx.user_id(), Utc::now());
        let mut update = UpdateQuery::new(E::TABLE)
            .set_all(entity.update_values())
            .filter(Predicate::eq(ID_COLUMN, entity.id()))
            .filter_all(scope_predicates(ctx));
        if let Some(guard) = E::UPDATE_GUARD {
            update = update.filter(Predicate::eq(STATUS_COLUMN, guard.as_str()));
        }

        debug!(tenant_id = ctx.tenant_id(), id = entity.id(), "Updating {}", E::NAME);
        let outcome = update
            .execute(&self.pool)
            .await
            .map_err(|e| write_error::<E>(e, "update"));
        self.cache.delete_all(&keys).await;

        if outcome? == 0 {
            return Err(self.missing_after_write(ctx, entity.id(), "update").await);
        }
        Ok(())
    }

    async fn delete_inner(&self, ctx: &RequestContext, id: &str) -> CoreResult<()> {
        let keys = self.keys_before_write(ctx, id).await?;
        let now = Utc::now();

        let mut parent = UpdateQuery::new(E::TABLE)
            .set(STATUS_COLUMN, Status::Deleted)
            .set(UPDATED_AT_COLUMN, now)
            .set(UPDATED_BY_COLUMN, ctx.user_id())
            .filter(Predicate::eq(ID_COLUMN, id))
            .filter_all(scope_predicates(ctx));
        if let Some(guard) = E::UPDATE_GUARD {
            parent = parent.filter(Predicate::eq(STATUS_COLUMN, guard.as_str()));
        }
        let children: Vec<UpdateQuery> = E::CHILDREN
            .iter()
            .map(|child| {
                UpdateQuery::new(child.table)
                    .set(STATUS_COLUMN, Status::Deleted)
                    .set(UPDATED_AT_COLUMN, now)
                    .set(UPDATED_BY_COLUMN, ctx.user_id())
                    .filter(Predicate::eq(child.parent_column, id))
                    .filter_all(scope_predicates(ctx))
            })
            .collect();

        debug!(tenant_id = ctx.tenant_id(), id, "Deleting {}", E::NAME);
        let outcome = with_tx(&self.pool, move |conn| {
            Box::pin(async move {
                let rows = parent
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| write_error::<E>(e, "delete"))?;
                if rows > 0 {
                    for child in &children {
                        child
                            .execute(&mut *conn)
                            .await
                            .map_err(|e| write_error::<E>(e, "delete"))?;
                    }
                }
                Ok(rows)
            })
        })
        .await;
        self.cache.delete_all(&keys).await;

        if outcome? == 0 {
            return Err(self.missing_after_write(ctx, id, "delete").await);
        }
        Ok(())
    }

    /// Tells "gone" from "guard failed" after a write touched no row.
    async fn missing_after_write(&self, ctx: &RequestContext, id: &str, operation: &str) -> Error {
        let exists = self
            .scoped(ctx, self.select())
            .filter(Predicate::eq(ID_COLUMN, id))
            .exists(&self.pool)
            .await;

        match exists {
            Ok(true) => {
                let expected = E::UPDATE_GUARD.map(|s| s.as_str()).unwrap_or("writable");
                not_found::<E>(id)
                    .with_hint(format!(
                        "{} with ID {} is no longer {} and cannot be modified",
                        title(E::NAME),
                        id,
                        expected
                    ))
                    .with_detail("precondition_failed", true)
            }
            Ok(false) => not_found::<E>(id),
            Err(e) => read_error::<E>(e, operation),
        }
    }
}

// =============================================================================
// Test Support
// =============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_capitalizes_first_letter() {
        assert_eq!(title("tax rate"), "Tax rate");
        assert_eq!(title(""), "");
    }

    #[test]
    fn test_scope_predicates_skip_missing_environment() {
        let ctx = RequestContext::new("t1");
        assert_eq!(scope_predicates(&ctx), vec![Predicate::eq(TENANT_COLUMN, "t1")]);

        let ctx = ctx.with_environment("e1");
        assert_eq!(scope_predicates(&ctx).len(), 2);
    }

    #[test]
    fn test_lookup_hit_visible_respects_scope_and_status() {
        let mut rate = ledgerline_core::TaxRate::percentage("t1", "VAT", "VAT", 20.0);
        rate.environment_id = "e1".to_string();

        let owner = RequestContext::new("t1").with_environment("e1");
        let anonymous = RequestContext::new("");
        let other_tenant = RequestContext::new("t2").with_environment("e1");
        let other_env = RequestContext::new("t1").with_environment("e2");

        assert!(lookup_hit_visible(&owner, LookupScope::Tenant, &rate));
        assert!(lookup_hit_visible(&anonymous, LookupScope::Global, &rate));
        assert!(!lookup_hit_visible(&other_tenant, LookupScope::Global, &rate));
        assert!(!lookup_hit_visible(&other_tenant, LookupScope::Tenant, &rate));
        assert!(!lookup_hit_visible(&other_env, LookupScope::Tenant, &rate));
        assert!(lookup_hit_visible(&other_env, LookupScope::Global, &rate));

        rate.status = Status::Deleted;
        assert!(!lookup_hit_visible(&owner, LookupScope::Tenant, &rate));
    }
}

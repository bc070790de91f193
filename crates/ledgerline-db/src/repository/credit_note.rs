//! # Credit Note Repository
//!
//! Credit notes own their line items: both are written in one transaction
//! and soft-deleted together.
//!
//! ## Keys
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  id                  cache key, primary key                             │
//! │  credit_note_number  unique per tenant/environment                      │
//! │  idempotency_key     unique per tenant/environment, cached lookup key   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Updates and deletes only apply while the note is still `published`.

use ledgerline_core::filter::CreditNoteFilter;
use ledgerline_core::query::{OrderSpec, Predicate, Query};
use ledgerline_core::{CoreResult, CreditNote, CreditNoteLineItem, Record, RequestContext, Status};
use tracing::debug;

use super::{
    read_error, scope_predicates, write_error, ChildTable, ConstraintRule, Entity, Lookup, LookupScope, Repository, Table,
    CREATED_AT_COLUMN, STATUS_COLUMN,
};
use crate::cache::PREFIX_CREDIT_NOTE;
use crate::pool::with_tx;
use crate::span::traced;
use crate::sql::{InsertQuery, SelectQuery, SqlValue};

pub type CreditNoteRepository = Repository<CreditNote>;

const LINE_ITEM_PARENT_COLUMN: &str = "credit_note_id";

// =============================================================================
// Line Items
// =============================================================================

impl Table for CreditNoteLineItem {
    const TABLE: &'static str = "credit_note_line_items";

    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "environment_id",
        "credit_note_id",
        "display_name",
        "amount_cents",
        "currency",
        "status",
        "created_at",
        "updated_at",
        "created_by",
        "updated_by",
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.environment_id.clone().into(),
            self.credit_note_id.clone().into(),
            self.display_name.clone().into(),
            self.amount_cents.into(),
            self.currency.clone().into(),
            self.status.into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.created_by.clone().into(),
            self.updated_by.clone().into(),
        ]
    }
}

// =============================================================================
// Credit Notes
// =============================================================================

impl Table for CreditNote {
    const TABLE: &'static str = "credit_notes";

    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "environment_id",
        "invoice_id",
        "customer_id",
        "subscription_id",
        "credit_note_number",
        "credit_note_status",
        "credit_note_type",
        "reason",
        "memo",
        "currency",
        "total_amount_cents",
        "idempotency_key",
        "voided_at",
        "finalized_at",
        "status",
        "created_at",
        "updated_at",
        "created_by",
        "updated_by",
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.environment_id.clone().into(),
            self.invoice_id.clone().into(),
            self.customer_id.clone().into(),
            self.subscription_id.clone().into(),
            self.credit_note_number.clone().into(),
            self.credit_note_status.as_str().into(),
            self.credit_note_type.as_str().into(),
            self.reason.clone().into(),
            self.memo.clone().into(),
            self.currency.clone().into(),
            self.total_amount_cents.into(),
            self.idempotency_key.clone().into(),
            self.voided_at.into(),
            self.finalized_at.into(),
            self.status.into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.created_by.clone().into(),
            self.updated_by.clone().into(),
        ]
    }
}

impl Entity for CreditNote {
    type Filter = CreditNoteFilter;

    const NAME: &'static str = "credit note";
    const ID_DETAIL: &'static str = "credit_note_id";
    const CACHE_PREFIX: &'static str = PREFIX_CREDIT_NOTE;

    const CONSTRAINTS: &'static [ConstraintRule] = &[
        ConstraintRule::already_exists(
            "credit_note_number",
            "A credit note with this number already exists",
        ),
        ConstraintRule::already_exists(
            "idempotency_key",
            "A credit note with this idempotency key already exists",
        ),
    ];

    const UPDATE_GUARD: Option<Status> = Some(Status::Published);

    const LOOKUP: Option<Lookup> = Some(Lookup {
        column: "idempotency_key",
        scope: LookupScope::Tenant,
    });

    const CHILDREN: &'static [ChildTable] = &[ChildTable {
        table: CreditNoteLineItem::TABLE,
        parent_column: LINE_ITEM_PARENT_COLUMN,
    }];

    fn field_name(field: &str) -> Option<&'static str> {
        Some(match field {
            "id" => "id",
            "invoice_id" => "invoice_id",
            "customer_id" => "customer_id",
            "subscription_id" => "subscription_id",
            "credit_note_number" => "credit_note_number",
            "credit_note_status" => "credit_note_status",
            "credit_note_type" => "credit_note_type",
            "reason" => "reason",
            "memo" => "memo",
            "currency" => "currency",
            "total_amount" => "total_amount_cents",
            "voided_at" => "voided_at",
            "finalized_at" => "finalized_at",
            "status" => "status",
            "created_at" => "created_at",
            "updated_at" => "updated_at",
            "created_by" => "created_by",
            "updated_by" => "updated_by",
            _ => return None,
        })
    }

    fn update_values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("credit_note_status", self.credit_note_status.as_str().into()),
            ("reason", self.reason.clone().into()),
            ("memo", self.memo.clone().into()),
            ("total_amount_cents", self.total_amount_cents.into()),
            ("idempotency_key", self.idempotency_key.clone().into()),
            ("voided_at", self.voided_at.into()),
            ("finalized_at", self.finalized_at.into()),
            ("status", self.status.into()),
            ("updated_at", self.updated_at.into()),
            ("updated_by", self.updated_by.clone().into()),
        ]
    }

    fn filter_predicates(filter: &CreditNoteFilter) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if !filter.credit_note_ids.is_empty() {
            predicates.push(Predicate::is_in("id", filter.credit_note_ids.iter()));
        }
        if let Some(invoice_id) = &filter.invoice_id {
            predicates.push(Predicate::eq("invoice_id", invoice_id));
        }
        if let Some(customer_id) = &filter.customer_id {
            predicates.push(Predicate::eq("customer_id", customer_id));
        }
        if !filter.credit_note_status.is_empty() {
            predicates.push(Predicate::is_in(
                "credit_note_status",
                filter.credit_note_status.iter().map(|s| s.as_str()),
            ));
        }
        predicates
    }

    fn lookup_value(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }
}

impl Repository<CreditNote> {
    /// Inserts `note` and its line items in one transaction.
    ///
    /// Line items inherit the note's tenant, environment and id. If any
    /// insert fails nothing is written.
    pub async fn create_with_line_items(&self, ctx: &RequestContext, note: &mut CreditNote) -> CoreResult<()> {
        traced(CreditNote::NAME, "create_with_line_items", async {
            self.prepare_create(ctx, note)?;
            for item in &mut note.line_items {
                item.tenant_id = note.tenant_id.clone();
                item.environment_id = note.environment_id.clone();
                item.credit_note_id = note.id.clone();
                item.stamp_created(ctx.user_id());
            }

            let parent = note.insert_query();
            let items: Vec<InsertQuery> = note.line_items.iter().map(Table::insert_query).collect();
            debug!(
                tenant_id = ctx.tenant_id(),
                id = %note.id,
                line_items = items.len(),
                "Creating credit note with line items"
            );

            with_tx(&self.pool, move |conn| {
                Box::pin(async move {
                    parent
                        .execute(&mut *conn)
                        .await
                        .map_err(|e| write_error::<CreditNote>(e, "create"))?;
                    for item in &items {
                        item.execute(&mut *conn)
                            .await
                            .map_err(|e| write_error::<CreditNote>(e, "create"))?;
                    }
                    Ok(())
                })
            })
            .await
        })
        .await
    }

    /// Reads a note by id with its non-deleted line items, oldest first.
    pub async fn get_with_line_items(&self, ctx: &RequestContext, id: &str) -> CoreResult<CreditNote> {
        traced(CreditNote::NAME, "get_with_line_items", async {
            let mut note = self.get_inner(ctx, id).await?;

            let query = scope_predicates(ctx)
                .into_iter()
                .fold(
                    SelectQuery::new(CreditNoteLineItem::TABLE, CreditNoteLineItem::COLUMNS),
                    Query::filter,
                )
                .filter(Predicate::eq(LINE_ITEM_PARENT_COLUMN, id))
                .filter(Predicate::not_in(STATUS_COLUMN, [Status::Deleted.as_str()]))
                .order_by(OrderSpec::asc(CREATED_AT_COLUMN))
                .order_by(OrderSpec::asc("id"));

            note.line_items = query
                .fetch_all(&self.pool)
                .await
                .map_err(|e| read_error::<CreditNote>(e, "get"))?;
            Ok(note)
        })
        .await
    }

    /// Reads the non-deleted note created with `key`.
    pub async fn get_by_idempotency_key(&self, ctx: &RequestContext, key: &str) -> CoreResult<CreditNote> {
        self.get_by_lookup(ctx, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{ctx, database};
    use ledgerline_core::CreditNoteStatus;

    fn note(tenant_id: &str, number: &str) -> CreditNote {
        let mut cn = CreditNote::new(tenant_id, "inv_1", "cus_1", number, "usd");
        cn.add_line_item("Refund seat", 1500);
        cn.add_line_item("Refund usage", 250);
        cn
    }

    async fn line_item_rows(db: &crate::Database, credit_note_id: &str, status: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM credit_note_line_items WHERE credit_note_id = ? AND status = ?")
            .bind(credit_note_id)
            .bind(status)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_with_line_items_and_read_back() {
        let db = database().await;
        let notes = db.credit_notes();
        let ctx = ctx("t1", "e1");

        let mut cn = note("t1", "CN-001");
        notes.create_with_line_items(&ctx, &mut cn).await.unwrap();

        let stored = notes.get_with_line_items(&ctx, &cn.id).await.unwrap();
        assert_eq!(stored.total_amount_cents, 1750);
        assert_eq!(stored.line_items.len(), 2);
        assert!(stored.line_items.iter().all(|li| li.environment_id == "e1"));
        assert!(stored.line_items.iter().all(|li| li.created_by == "user_test"));

        // Plain get does not load line items.
        assert!(notes.get(&ctx, &cn.id).await.unwrap().line_items.is_empty());
    }

    #[tokio::test]
    async fn test_failed_line_item_rolls_back_note() {
        let db = database().await;
        let notes = db.credit_notes();
        let ctx = ctx("t1", "e1");

        let mut cn = note("t1", "CN-001");
        let duplicate = cn.line_items[0].id.clone();
        cn.line_items[1].id = duplicate;

        let err = notes.create_with_line_items(&ctx, &mut cn).await.unwrap_err();
        assert!(err.is_already_exists());

        assert!(!notes.exists(&ctx, &cn.id).await.unwrap());
        assert_eq!(line_item_rows(&db, &cn.id, "published").await, 0);
    }

    #[tokio::test]
    async fn test_lookup_by_idempotency_key() {
        let db = database().await;
        let notes = db.credit_notes();
        let owner = ctx("t1", "e1");
        let other_tenant = ctx("t2", "e1");

        let mut cn = note("t1", "CN-001");
        cn.idempotency_key = Some("idem_1".to_string());
        notes.create(&owner, &mut cn).await.unwrap();

        let found = notes.get_by_idempotency_key(&owner, "idem_1").await.unwrap();
        assert_eq!(found.id, cn.id);

        let err = notes.get_by_idempotency_key(&other_tenant, "idem_1").await.unwrap_err();
        assert!(err.is_not_found());

        let mut retry = note("t1", "CN-002");
        retry.idempotency_key = Some("idem_1".to_string());
        let err = notes.create(&owner, &mut retry).await.unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(err.hint(), "A credit note with this idempotency key already exists");
    }

    #[tokio::test]
    async fn test_update_refreshes_lookup_entry() {
        let db = database().await;
        let notes = db.credit_notes();
        let ctx = ctx("t1", "e1");

        let mut cn = note("t1", "CN-001");
        cn.idempotency_key = Some("idem_1".to_string());
        notes.create(&ctx, &mut cn).await.unwrap();
        notes.get_by_idempotency_key(&ctx, "idem_1").await.unwrap();

        cn.credit_note_status = CreditNoteStatus::Finalized;
        cn.memo = "finalized by billing run".to_string();
        notes.update(&ctx, &mut cn).await.unwrap();

        let found = notes.get_by_idempotency_key(&ctx, "idem_1").await.unwrap();
        assert_eq!(found.credit_note_status, CreditNoteStatus::Finalized);
        assert_eq!(found.memo, "finalized by billing run");
    }

    #[tokio::test]
    async fn test_delete_soft_deletes_line_items() {
        let db = database().await;
        let notes = db.credit_notes();
        let ctx = ctx("t1", "e1");

        let mut cn = note("t1", "CN-001");
        cn.idempotency_key = Some("idem_1".to_string());
        notes.create_with_line_items(&ctx, &mut cn).await.unwrap();
        notes.get_by_idempotency_key(&ctx, "idem_1").await.unwrap();

        notes.delete(&ctx, &cn.id).await.unwrap();

        assert_eq!(line_item_rows(&db, &cn.id, "deleted").await, 2);
        assert!(notes.get_with_line_items(&ctx, &cn.id).await.unwrap().line_items.is_empty());
        assert!(notes.get_by_idempotency_key(&ctx, "idem_1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_filter_by_invoice_and_status() {
        let db = database().await;
        let notes = db.credit_notes();
        let ctx = ctx("t1", "e1");

        let mut draft = note("t1", "CN-001");
        notes.create(&ctx, &mut draft).await.unwrap();
        let mut finalized = note("t1", "CN-002");
        finalized.credit_note_status = CreditNoteStatus::Finalized;
        notes.create(&ctx, &mut finalized).await.unwrap();
        let mut other_invoice = CreditNote::new("t1", "inv_2", "cus_1", "CN-003", "usd");
        notes.create(&ctx, &mut other_invoice).await.unwrap();

        let filter = CreditNoteFilter {
            invoice_id: Some("inv_1".to_string()),
            credit_note_status: vec![CreditNoteStatus::Finalized],
            ..CreditNoteFilter::default()
        };
        let listed = notes.list(&ctx, Some(&filter)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, finalized.id);

        let by_invoice = CreditNoteFilter {
            invoice_id: Some("inv_1".to_string()),
            ..CreditNoteFilter::default()
        };
        assert_eq!(notes.count(&ctx, Some(&by_invoice)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_entities_without_lookup_reject_lookup_reads() {
        let db = database().await;
        let err = db.tax_rates().get_by_lookup(&ctx("t1", "e1"), "VAT20").await.unwrap_err();
        assert!(err.is_validation());
    }
}

//! # Tax Rate Repository
//!
//! Tax rates are plain tenant-scoped rows: no update guard, no lookup key.
//! `code` is unique per tenant and environment among non-deleted rows.
//!
//! ## Queryable Fields
//! ```text
//! ┌──────────────────┬──────────────────────┐
//! │ field            │ column               │
//! ├──────────────────┼──────────────────────┤
//! │ id, name, code   │ same                 │
//! │ tax_rate_type    │ tax_rate_type        │
//! │ percentage_value │ percentage_value     │
//! │ fixed_value      │ fixed_value_cents    │
//! │ scope, status    │ same                 │
//! │ valid_from/to    │ same                 │
//! │ created_at/by    │ same                 │
//! │ updated_at/by    │ same                 │
//! └──────────────────┴──────────────────────┘
//! ```

use ledgerline_core::filter::TaxRateFilter;
use ledgerline_core::query::Predicate;
use ledgerline_core::TaxRate;

use super::{ConstraintRule, Entity, Repository, Table};
use crate::cache::PREFIX_TAX_RATE;
use crate::sql::SqlValue;

pub type TaxRateRepository = Repository<TaxRate>;

impl Table for TaxRate {
    const TABLE: &'static str = "tax_rates";

    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "environment_id",
        "name",
        "code",
        "description",
        "tax_rate_type",
        "percentage_value",
        "fixed_value_cents",
        "scope",
        "valid_from",
        "valid_to",
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
            self.name.clone().into(),
            self.code.clone().into(),
            self.description.clone().into(),
            self.tax_rate_type.as_str().into(),
            self.percentage_value.into(),
            self.fixed_value_cents.into(),
            self.scope.clone().into(),
            self.valid_from.into(),
            self.valid_to.into(),
            self.status.into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.created_by.clone().into(),
            self.updated_by.clone().into(),
        ]
    }
}

impl Entity for TaxRate {
    type Filter = TaxRateFilter;

    const NAME: &'static str = "tax rate";
    const ID_DETAIL: &'static str = "tax_rate_id";
    const CACHE_PREFIX: &'static str = PREFIX_TAX_RATE;

    const CONSTRAINTS: &'static [ConstraintRule] = &[ConstraintRule::already_exists(
        "code",
        "A tax rate with this code already exists",
    )];

    fn field_name(field: &str) -> Option<&'static str> {
        Some(match field {
            "id" => "id",
            "name" => "name",
            "code" => "code",
            "description" => "description",
            "tax_rate_type" => "tax_rate_type",
            "percentage_value" => "percentage_value",
            "fixed_value" => "fixed_value_cents",
            "scope" => "scope",
            "valid_from" => "valid_from",
            "valid_to" => "valid_to",
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
            ("name", self.name.clone().into()),
            ("code", self.code.clone().into()),
            ("description", self.description.clone().into()),
            ("tax_rate_type", self.tax_rate_type.as_str().into()),
            ("percentage_value", self.percentage_value.into()),
            ("fixed_value_cents", self.fixed_value_cents.into()),
            ("scope", self.scope.clone().into()),
            ("valid_from", self.valid_from.into()),
            ("valid_to", self.valid_to.into()),
            ("status", self.status.into()),
            ("updated_at", self.updated_at.into()),
            ("updated_by", self.updated_by.clone().into()),
        ]
    }

    fn filter_predicates(filter: &TaxRateFilter) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if !filter.tax_rate_ids.is_empty() {
            predicates.push(Predicate::is_in("id", filter.tax_rate_ids.iter()));
        }
        if let Some(code) = &filter.code {
            predicates.push(Predicate::eq("code", code));
        }
        if let Some(scope) = &filter.scope {
            predicates.push(Predicate::eq("scope", scope));
        }
        predicates
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{ctx, database};
    use ledgerline_core::dsl::{FilterCondition, FilterOperator, FilterValue, SortCondition};
    use ledgerline_core::query::SortDirection;
    use ledgerline_core::Status;

    fn rate(tenant_id: &str, code: &str, percentage: f64) -> TaxRate {
        TaxRate::percentage(tenant_id, code, &format!("{code} rate"), percentage)
    }

    #[tokio::test]
    async fn test_create_fills_environment_and_creator() {
        let db = database().await;
        let rates = db.tax_rates();
        let ctx = ctx("t1", "e1");

        let mut vat = rate("t1", "VAT20", 20.0);
        rates.create(&ctx, &mut vat).await.unwrap();

        let stored = rates.get(&ctx, &vat.id).await.unwrap();
        assert_eq!(stored.environment_id, "e1");
        assert_eq!(stored.created_by, "user_test");
        assert_eq!(stored.percentage_value, Some(20.0));
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_tenant() {
        let db = database().await;
        let mut vat = rate("t2", "VAT20", 20.0);

        let err = db.tax_rates().create(&ctx("t1", "e1"), &mut vat).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_rows_are_invisible_to_other_tenants() {
        let db = database().await;
        let rates = db.tax_rates();
        let mut vat = rate("t1", "VAT20", 20.0);
        rates.create(&ctx("t1", "e1"), &mut vat).await.unwrap();

        // Warm the cache under t1 first.
        rates.get(&ctx("t1", "e1"), &vat.id).await.unwrap();

        let err = rates.get(&ctx("t2", "e1"), &vat.id).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.details().get("tax_rate_id"), Some(&vat.id));

        let other_env = rates.get(&ctx("t1", "e2"), &vat.id).await.unwrap_err();
        assert!(other_env.is_not_found());

        assert!(rates.list(&ctx("t2", "e1"), None).await.unwrap().is_empty());
        assert_eq!(rates.count(&ctx("t2", "e1"), None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_same_local_id_in_two_tenants_never_shares_a_cache_entry() {
        let db = database().await;
        let rates = db.tax_rates();
        let t1 = ctx("t1", "e1");
        let t2 = ctx("t2", "e1");

        let mut vat = rate("t1", "VAT20", 20.0);
        vat.id = "txr_shared".to_string();
        rates.create(&t1, &mut vat).await.unwrap();
        rates.get(&t1, "txr_shared").await.unwrap();

        // Ids are unique in the store, so t2's row with the same local id
        // only exists as a cache entry.
        let mut theirs = vat.clone();
        theirs.tenant_id = "t2".to_string();
        theirs.name = "t2 rate".to_string();
        let t1_key = rates.cache().key("t1", "e1", "txr_shared");
        let t2_key = rates.cache().key("t2", "e1", "txr_shared");
        assert_ne!(t1_key, t2_key);
        rates.cache().set(&t2_key, &theirs).await;

        let mine = rates.get(&t1, "txr_shared").await.unwrap();
        assert_eq!(mine.tenant_id, "t1");
        assert_eq!(mine.name, vat.name);
        assert_eq!(rates.get(&t2, "txr_shared").await.unwrap().tenant_id, "t2");

        rates.cache().delete(&t2_key).await;
        assert!(rates.get(&t2, "txr_shared").await.unwrap_err().is_not_found());
        assert_eq!(rates.get(&t1, "txr_shared").await.unwrap().tenant_id, "t1");
    }

    #[tokio::test]
    async fn test_get_reads_through_cache_and_update_invalidates() {
        let db = database().await;
        let rates = db.tax_rates();
        let ctx = ctx("t1", "e1");
        let mut vat = rate("t1", "VAT20", 20.0);
        rates.create(&ctx, &mut vat).await.unwrap();

        let first = rates.get(&ctx, &vat.id).await.unwrap();

        sqlx::query("UPDATE tax_rates SET name = 'changed behind the cache' WHERE id = ?")
            .bind(&vat.id)
            .execute(db.pool())
            .await
            .unwrap();

        let cached = rates.get(&ctx, &vat.id).await.unwrap();
        assert_eq!(cached.name, first.name);

        let mut edited = cached.clone();
        edited.percentage_value = Some(21.0);
        rates.update(&ctx, &mut edited).await.unwrap();

        let fresh = rates.get(&ctx, &vat.id).await.unwrap();
        assert_eq!(fresh.percentage_value, Some(21.0));
        assert_eq!(fresh.updated_by, "user_test");
    }

    #[tokio::test]
    async fn test_duplicate_code_is_already_exists() {
        let db = database().await;
        let rates = db.tax_rates();
        let ctx = ctx("t1", "e1");

        rates.create(&ctx, &mut rate("t1", "VAT20", 20.0)).await.unwrap();
        let err = rates.create(&ctx, &mut rate("t1", "VAT20", 19.0)).await.unwrap_err();

        assert!(err.is_already_exists());
        assert_eq!(err.hint(), "A tax rate with this code already exists");
        assert_eq!(err.details().get("constraint").map(String::as_str), Some("code"));

        // Same code in another environment is a different row.
        rates.create(&ctx.clone().with_environment("e2"), &mut rate("t1", "VAT20", 19.0))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_code_is_reusable_after_delete() {
        let db = database().await;
        let rates = db.tax_rates();
        let ctx = ctx("t1", "e1");

        let mut vat = rate("t1", "VAT20", 20.0);
        rates.create(&ctx, &mut vat).await.unwrap();
        rates.delete(&ctx, &vat.id).await.unwrap();

        rates.create(&ctx, &mut rate("t1", "VAT20", 21.0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_fields_are_validation_errors() {
        let db = database().await;
        let rates = db.tax_rates();
        let ctx = ctx("t1", "e1");

        let dsl = TaxRateFilter {
            filters: vec![FilterCondition::new(
                "tenant_secret",
                FilterOperator::Equal,
                FilterValue::String("x".into()),
            )],
            ..TaxRateFilter::default()
        };
        let err = rates.list(&ctx, Some(&dsl)).await.unwrap_err();
        assert!(err.is_validation());

        let dsl_sort = TaxRateFilter {
            sort: vec![SortCondition::new("nope", SortDirection::Asc)],
            ..TaxRateFilter::default()
        };
        assert!(rates.list(&ctx, Some(&dsl_sort)).await.unwrap_err().is_validation());

        let mut plain_sort = TaxRateFilter::default();
        plain_sort.query.sort = "nope".to_string();
        assert!(rates.list(&ctx, Some(&plain_sort)).await.unwrap_err().is_validation());
        assert!(rates.count(&ctx, Some(&dsl)).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_dsl_filters_and_sorts() {
        let db = database().await;
        let rates = db.tax_rates();
        let ctx = ctx("t1", "e1");
        for (code, pct) in [("VAT5", 5.0), ("VAT20", 20.0), ("GST10", 10.0)] {
            rates.create(&ctx, &mut rate("t1", code, pct)).await.unwrap();
        }

        let filter = TaxRateFilter {
            filters: vec![FilterCondition::new(
                "code",
                FilterOperator::Contains,
                FilterValue::String("vat".into()),
            )],
            sort: vec![SortCondition::new("percentage_value", SortDirection::Desc)],
            ..TaxRateFilter::default()
        };

        let listed = rates.list(&ctx, Some(&filter)).await.unwrap();
        let codes: Vec<&str> = listed.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["VAT20", "VAT5"]);
        assert_eq!(rates.count(&ctx, Some(&filter)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_plain_sort_and_entity_predicates() {
        let db = database().await;
        let rates = db.tax_rates();
        let ctx = ctx("t1", "e1");
        let mut ids = Vec::new();
        for (code, pct) in [("B", 2.0), ("A", 1.0), ("C", 3.0)] {
            let mut r = rate("t1", code, pct);
            rates.create(&ctx, &mut r).await.unwrap();
            ids.push(r.id);
        }

        let mut filter = TaxRateFilter {
            tax_rate_ids: ids[..2].to_vec(),
            ..TaxRateFilter::default()
        };
        filter.query.sort = "code".to_string();
        filter.query.order = "asc".to_string();

        let listed = rates.list(&ctx, Some(&filter)).await.unwrap();
        let codes: Vec<&str> = listed.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B"]);

        let by_code = TaxRateFilter {
            code: Some("C".to_string()),
            ..TaxRateFilter::default()
        };
        assert_eq!(rates.list(&ctx, Some(&by_code)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_default_list_is_paged_and_list_all_is_not() {
        let db = database().await;
        let rates = db.tax_rates();
        let ctx = ctx("t1", "e1");
        for i in 0..55 {
            rates.create(&ctx, &mut rate("t1", &format!("R{i:02}"), 1.0)).await.unwrap();
        }

        assert_eq!(rates.list(&ctx, None).await.unwrap().len(), 50);
        assert_eq!(rates.list_all(&ctx, None).await.unwrap().len(), 55);
        assert_eq!(rates.count(&ctx, None).await.unwrap(), 55);

        let mut second_page = TaxRateFilter::default();
        second_page.query.offset = 50;
        assert_eq!(rates.list(&ctx, Some(&second_page)).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_row_from_list_and_exists() {
        let db = database().await;
        let rates = db.tax_rates();
        let ctx = ctx("t1", "e1");
        let mut vat = rate("t1", "VAT20", 20.0);
        rates.create(&ctx, &mut vat).await.unwrap();
        assert!(rates.exists(&ctx, &vat.id).await.unwrap());

        rates.delete(&ctx, &vat.id).await.unwrap();

        assert!(!rates.exists(&ctx, &vat.id).await.unwrap());
        assert!(rates.list(&ctx, None).await.unwrap().is_empty());

        let mut deleted = TaxRateFilter::default();
        deleted.query.status = Status::Deleted.as_str().to_string();
        assert_eq!(rates.list(&ctx, Some(&deleted)).await.unwrap().len(), 1);

        // get is not status-filtered; the row is still readable by id.
        assert_eq!(rates.get(&ctx, &vat.id).await.unwrap().status, Status::Deleted);

        assert!(rates.delete(&ctx, "txr_missing").await.unwrap_err().is_not_found());
    }
}

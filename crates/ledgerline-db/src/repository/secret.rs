//! # Secret Repository
//!
//! API keys and integration credentials. `value` is unique across tenants,
//! so API-key authentication resolves the tenant from the key alone:
//!
//! ```text
//! get_by_value(ctx without tenant, "sk_...")
//!   cache("secret:value", "", "", value) ─ miss ─► SELECT ... WHERE value = ?
//!                                                    AND status = 'published'
//!                                                    AND secret_type = 'private_key'
//! ```

use chrono::Utc;
use ledgerline_core::filter::SecretFilter;
use ledgerline_core::query::Predicate;
use ledgerline_core::{CoreResult, Error, RequestContext, Secret, SecretType, Status};
use tracing::debug;

use super::{
    not_found, scope_predicates, write_error, ConstraintRule, Entity, Lookup, LookupScope, Repository, Table,
    ID_COLUMN, STATUS_COLUMN, UPDATED_AT_COLUMN,
};
use crate::cache::PREFIX_SECRET;
use crate::span::traced;
use crate::sql::{SqlValue, UpdateQuery};

pub type SecretRepository = Repository<Secret>;

const VALUE_COLUMN: &str = "value";

impl Table for Secret {
    const TABLE: &'static str = "secrets";

    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "environment_id",
        "name",
        "secret_type",
        "provider",
        "value",
        "display_id",
        "expires_at",
        "last_used_at",
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
            self.secret_type.as_str().into(),
            self.provider.clone().into(),
            self.value.clone().into(),
            self.display_id.clone().into(),
            self.expires_at.into(),
            self.last_used_at.into(),
            self.status.into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.created_by.clone().into(),
            self.updated_by.clone().into(),
        ]
    }
}

impl Entity for Secret {
    type Filter = SecretFilter;

    const NAME: &'static str = "secret";
    const ID_DETAIL: &'static str = "secret_id";
    const CACHE_PREFIX: &'static str = PREFIX_SECRET;

    const CONSTRAINTS: &'static [ConstraintRule] = &[ConstraintRule::already_exists(
        VALUE_COLUMN,
        "A secret with this value already exists",
    )];

    const LOOKUP: Option<Lookup> = Some(Lookup {
        column: VALUE_COLUMN,
        scope: LookupScope::Global,
    });

    fn field_name(field: &str) -> Option<&'static str> {
        Some(match field {
            "id" => "id",
            "name" => "name",
            "secret_type" => "secret_type",
            "provider" => "provider",
            "display_id" => "display_id",
            "expires_at" => "expires_at",
            "last_used_at" => "last_used_at",
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
            ("expires_at", self.expires_at.into()),
            ("last_used_at", self.last_used_at.into()),
            ("status", self.status.into()),
            ("updated_at", self.updated_at.into()),
            ("updated_by", self.updated_by.clone().into()),
        ]
    }

    fn filter_predicates(filter: &SecretFilter) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(secret_type) = filter.secret_type {
            predicates.push(Predicate::eq("secret_type", secret_type.as_str()));
        }
        if let Some(provider) = &filter.provider {
            predicates.push(Predicate::eq("provider", provider));
        }
        predicates
    }

    fn lookup_value(&self) -> Option<&str> {
        Some(&self.value)
    }
}

impl Repository<Secret> {
    /// Resolves a published private API key by its value.
    ///
    /// A context without a tenant searches every tenant; otherwise only the
    /// caller's tenant is searched.
    pub async fn get_by_value(&self, ctx: &RequestContext, value: &str) -> CoreResult<Secret> {
        traced(Secret::NAME, "get_by_value", async {
            let lookup = Lookup {
                column: VALUE_COLUMN,
                scope: LookupScope::Global,
            };
            let extra = vec![
                Predicate::eq(STATUS_COLUMN, Status::Published.as_str()),
                Predicate::eq("secret_type", SecretType::PrivateKey.as_str()),
            ];
            let accept =
                |secret: &Secret| secret.status == Status::Published && secret.secret_type == SecretType::PrivateKey;

            self.lookup(ctx, lookup, value, extra, accept)
                .await?
                .ok_or_else(|| Error::not_found("secret not found").with_hint("Invalid API key"))
        })
        .await
    }

    /// Stamps `last_used_at` with the current time.
    pub async fn update_last_used(&self, ctx: &RequestContext, id: &str) -> CoreResult<()> {
        traced(Secret::NAME, "update_last_used", async {
            let keys = self.keys_before_write(ctx, id).await?;
            let now = Utc::now();

            debug!(tenant_id = ctx.tenant_id(), id, "Updating secret last used time");
            let outcome = UpdateQuery::new(Secret::TABLE)
                .set("last_used_at", now)
                .set(UPDATED_AT_COLUMN, now)
                .filter(Predicate::eq(ID_COLUMN, id))
                .filter_all(scope_predicates(ctx))
                .execute(&self.pool)
                .await
                .map_err(|e| write_error::<Secret>(e, "update"));
            self.cache.delete_all(&keys).await;

            if outcome? == 0 {
                return Err(not_found::<Secret>(id));
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::repository::test_support::{ctx, database};

    #[tokio::test]
    async fn test_get_by_value_resolves_tenant() {
        let db = database().await;
        let secrets = db.secrets();

        let mut key = Secret::api_key("t1", "server key");
        secrets.create(&ctx("t1", "e1"), &mut key).await.unwrap();

        let anonymous = RequestContext::new("");
        let found = secrets.get_by_value(&anonymous, &key.value).await.unwrap();
        assert_eq!(found.id, key.id);
        assert_eq!(found.tenant_id, "t1");

        // Second read is served from the cache.
        let cached = secrets.get_by_value(&anonymous, &key.value).await.unwrap();
        assert_eq!(cached, found);

        let same_tenant = secrets.get_by_value(&ctx("t1", "e1"), &key.value).await.unwrap();
        assert_eq!(same_tenant.id, key.id);

        let err = secrets.get_by_value(&ctx("t2", "e1"), &key.value).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.hint(), "Invalid API key");
    }

    #[tokio::test]
    async fn test_get_by_lookup_cache_hit_stays_in_tenant() {
        let db = database().await;
        let secrets = db.secrets();
        let owner = ctx("t1", "e1");
        let intruder = ctx("t2", "e1");

        let mut key = Secret::api_key("t1", "server key");
        secrets.create(&owner, &mut key).await.unwrap();
        assert!(secrets.get_by_lookup(&intruder, &key.value).await.unwrap_err().is_not_found());

        // Reading by id populates the shared value key.
        secrets.get(&owner, &key.id).await.unwrap();
        let err = secrets.get_by_lookup(&intruder, &key.value).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(secrets.get_by_value(&intruder, &key.value).await.unwrap_err().is_not_found());

        let found = secrets.get_by_lookup(&owner, &key.value).await.unwrap();
        assert_eq!(found.id, key.id);
    }

    #[tokio::test]
    async fn test_get_by_lookup_skips_deleted_cache_entry() {
        let db = database().await;
        let secrets = db.secrets();
        let owner = ctx("t1", "e1");

        let mut key = Secret::api_key("t1", "server key");
        secrets.create(&owner, &mut key).await.unwrap();
        secrets.delete(&owner, &key.id).await.unwrap();

        // `get` still returns the deleted row and caches it under every key.
        assert_eq!(secrets.get(&owner, &key.id).await.unwrap().status, Status::Deleted);
        assert!(secrets.get_by_lookup(&owner, &key.value).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_get_by_value_only_matches_published_private_keys() {
        let db = database().await;
        let secrets = db.secrets();
        let ctx = ctx("t1", "e1");

        let mut publishable = Secret::api_key("t1", "browser key");
        publishable.secret_type = SecretType::PublishableKey;
        secrets.create(&ctx, &mut publishable).await.unwrap();
        assert!(secrets.get_by_value(&ctx, &publishable.value).await.unwrap_err().is_not_found());

        let mut revoked = Secret::api_key("t1", "old key");
        secrets.create(&ctx, &mut revoked).await.unwrap();
        secrets.get_by_value(&ctx, &revoked.value).await.unwrap();

        revoked.status = Status::Archived;
        secrets.update(&ctx, &mut revoked).await.unwrap();
        assert!(secrets.get_by_value(&ctx, &revoked.value).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_value_is_rejected_across_tenants() {
        let db = database().await;
        let secrets = db.secrets();

        let mut key = Secret::api_key("t1", "server key");
        secrets.create(&ctx("t1", "e1"), &mut key).await.unwrap();

        let mut copy = Secret::api_key("t2", "copied key");
        copy.value = key.value.clone();
        let err = secrets.create(&ctx("t2", "e1"), &mut copy).await.unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(err.hint(), "A secret with this value already exists");
    }

    #[tokio::test]
    async fn test_update_last_used() {
        let db = database().await;
        let secrets = db.secrets();
        let other_tenant = ctx("t2", "e1");
        let ctx = ctx("t1", "e1");

        let mut key = Secret::api_key("t1", "server key");
        secrets.create(&ctx, &mut key).await.unwrap();
        assert!(secrets.get(&ctx, &key.id).await.unwrap().last_used_at.is_none());

        secrets.update_last_used(&ctx, &key.id).await.unwrap();
        assert!(secrets.get(&ctx, &key.id).await.unwrap().last_used_at.is_some());

        let err = secrets.update_last_used(&ctx, "secret_missing").await.unwrap_err();
        assert!(err.is_not_found());
        let err = secrets.update_last_used(&other_tenant, &key.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_filter_by_type_and_provider() {
        let db = database().await;
        let secrets = db.secrets();
        let ctx = ctx("t1", "e1");

        secrets.create(&ctx, &mut Secret::api_key("t1", "a")).await.unwrap();
        let mut integration = Secret::api_key("t1", "stripe");
        integration.secret_type = SecretType::Integration;
        integration.provider = "stripe".to_string();
        secrets.create(&ctx, &mut integration).await.unwrap();

        let filter = SecretFilter {
            secret_type: Some(SecretType::Integration),
            ..SecretFilter::default()
        };
        let listed = secrets.list(&ctx, Some(&filter)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].provider, "stripe");

        let native = SecretFilter {
            provider: Some("ledgerline".to_string()),
            ..SecretFilter::default()
        };
        assert_eq!(secrets.count(&ctx, Some(&native)).await.unwrap(), 1);
    }
}

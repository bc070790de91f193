//! Typed cache facade bound to one entity type.
//!
//! Values are stored as JSON. A value that no longer decodes as `E` (schema
//! change, foreign writer) reads as a miss and is evicted.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn, Instrument};

use super::{generate_key, CacheBackend};
use crate::span::cache_span;

pub struct EntityCache<E> {
    backend: Arc<dyn CacheBackend>,
    prefix: &'static str,
    ttl: Duration,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityCache<E> {
    fn clone(&self) -> Self {
        EntityCache {
            backend: Arc::clone(&self.backend),
            prefix: self.prefix,
            ttl: self.ttl,
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for EntityCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCache")
            .field("prefix", &self.prefix)
            .field("ttl", &self.ttl)
            .field("backend", &self.backend)
            .finish()
    }
}

impl<E> EntityCache<E>
where
    E: Serialize + DeserializeOwned,
{
    pub fn new(backend: Arc<dyn CacheBackend>, prefix: &'static str, ttl: Duration) -> Self {
        EntityCache {
            backend,
            prefix,
            ttl,
            _entity: PhantomData,
        }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// Key of the entry for `local_key` under a tenant/environment scope.
    pub fn key(&self, tenant_id: &str, environment_id: &str, local_key: &str) -> String {
        generate_key(self.prefix, tenant_id, environment_id, local_key)
    }

    /// Key of an alternate-lookup entry; `column` keeps lookup keys apart
    /// from id keys.
    pub fn lookup_key(&self, column: &str, tenant_id: &str, environment_id: &str, value: &str) -> String {
        let prefix = format!("{}:{}", self.prefix, column);
        generate_key(&prefix, tenant_id, environment_id, value)
    }

    pub async fn get(&self, key: &str) -> Option<E> {
        async {
            let bytes = self.backend.get(key).await?;
            match serde_json::from_slice::<E>(&bytes) {
                Ok(value) => {
                    debug!(key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key, error = %e, "Undecodable cache entry, evicting");
                    self.backend.delete(key).await;
                    None
                }
            }
        }
        .instrument(cache_span(self.prefix, "get"))
        .await
    }

    pub async fn set(&self, key: &str, value: &E) {
        async {
            match serde_json::to_vec(value) {
                Ok(bytes) => self.backend.set(key, bytes, self.ttl).await,
                Err(e) => warn!(key, error = %e, "Failed to encode cache entry"),
            }
        }
        .instrument(cache_span(self.prefix, "set"))
        .await
    }

    pub async fn delete(&self, key: &str) {
        self.backend
            .delete(key)
            .instrument(cache_span(self.prefix, "delete"))
            .await
    }

    /// Deletes every key in `keys`.
    pub async fn delete_all(&self, keys: &[String]) {
        for key in keys {
            self.delete(key).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        id: String,
        size: u32,
    }

    fn cache(backend: Arc<InMemoryCache>) -> EntityCache<Widget> {
        EntityCache::new(backend, "widget", Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_round_trips_typed_values() {
        let backend = Arc::new(InMemoryCache::new());
        let widgets = cache(backend);
        let key = widgets.key("t1", "e1", "w_1");
        let widget = Widget { id: "w_1".to_string(), size: 3 };

        widgets.set(&key, &widget).await;
        assert_eq!(widgets.get(&key).await, Some(widget));

        widgets.delete(&key).await;
        assert_eq!(widgets.get(&key).await, None);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss_and_evicted() {
        let backend = Arc::new(InMemoryCache::new());
        let widgets = cache(backend.clone());
        let key = widgets.key("t1", "e1", "w_1");

        backend.set(&key, b"{\"not\":\"a widget\"}".to_vec(), Duration::from_secs(60)).await;

        assert_eq!(widgets.get(&key).await, None);
        assert!(backend.get(&key).await.is_none());
    }

    #[test]
    fn test_lookup_keys_are_apart_from_id_keys() {
        let widgets = cache(Arc::new(InMemoryCache::new()));
        assert_ne!(
            widgets.key("t1", "e1", "abc"),
            widgets.lookup_key("serial", "t1", "e1", "abc")
        );
    }
}

//! # Tenant-Scoped Cache
//!
//! Cache-aside storage for repository reads.
//!
//! ## Read/Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  get(ctx, id)                                                           │
//! │     │                                                                   │
//! │     ├─► EntityCache::get(key) ── hit ──► return entity                  │
//! │     │        │                                                          │
//! │     │       miss (absent, expired, undecodable)                         │
//! │     │        ▼                                                          │
//! │     ├─► store query (tenant + environment scoped)                       │
//! │     │        │                                                          │
//! │     │        ▼                                                          │
//! │     └─► EntityCache::set(every key of the entity), return entity        │
//! │                                                                         │
//! │  update / delete ──► store write ──► EntityCache::delete(every key)     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Format
//! `generate_key` length-prefixes each part, so no two distinct part tuples
//! share a key: `("a:b", "c")` and `("a", "b:c")` stay apart.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

pub mod entity;
pub mod memory;
pub mod redis;

pub use entity::EntityCache;
pub use memory::InMemoryCache;
pub use self::redis::RedisCache;

/// Default lifetime of an entry.
pub const EXPIRY_DEFAULT_IN_MEMORY: Duration = Duration::from_secs(30 * 60);

pub const PREFIX_TAX_RATE: &str = "tax_rate";
pub const PREFIX_TASK: &str = "task";
pub const PREFIX_CREDIT_NOTE: &str = "credit_note";
pub const PREFIX_SECRET: &str = "secret";

// =============================================================================
// Backend
// =============================================================================

/// Byte-level cache storage.
///
/// Backends never fail the caller: an unreachable backend reads as a miss
/// and drops writes, logging a warning.
#[async_trait]
pub trait CacheBackend: Send + Sync + fmt::Debug {
    /// Returns the live value stored under `key`.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);

    /// Removes `key`; absent keys are ignored.
    async fn delete(&self, key: &str);
}

// =============================================================================
// Keys
// =============================================================================

/// Builds the key of one cache entry.
///
/// ## Example
/// ```rust
/// use ledgerline_db::cache::generate_key;
///
/// let key = generate_key("tax_rate", "t1", "e1", "txr_1");
/// assert_eq!(key, "8:tax_rate|2:t1|2:e1|5:txr_1");
/// ```
pub fn generate_key(prefix: &str, tenant_id: &str, environment_id: &str, local_key: &str) -> String {
    let parts = [prefix, tenant_id, environment_id, local_key];
    let mut key = String::with_capacity(parts.iter().map(|p| p.len() + 4).sum());
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            key.push('|');
        }
        key.push_str(&part.len().to_string());
        key.push(':');
        key.push_str(part);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic() {
        assert_eq!(
            generate_key(PREFIX_TASK, "t1", "e1", "task_1"),
            generate_key(PREFIX_TASK, "t1", "e1", "task_1")
        );
    }

    #[test]
    fn test_keys_do_not_collide_across_part_boundaries() {
        assert_ne!(
            generate_key("p", "a:b", "c", "id"),
            generate_key("p", "a", "b:c", "id")
        );
        assert_ne!(generate_key("p", "t1", "", "x"), generate_key("p", "", "t1", "x"));
        assert_ne!(generate_key("p", "t|1", "e", "x"), generate_key("p", "t", "1|e", "x"));
    }

    #[test]
    fn test_keys_differ_per_tenant() {
        assert_ne!(
            generate_key(PREFIX_TAX_RATE, "t1", "e1", "txr_1"),
            generate_key(PREFIX_TAX_RATE, "t2", "e1", "txr_1")
        );
    }
}

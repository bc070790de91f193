//! Redis cache backend.
//!
//! `SET key value EX ttl` / `GET` / `DEL` over a [`ConnectionManager`], which
//! reconnects on its own. Command failures are logged and read as misses.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use super::CacheBackend;
use crate::error::{DbError, DbResult};

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisCache {
    /// Connects to `redis_url`, e.g. `redis://127.0.0.1:6379/0`.
    pub async fn connect(redis_url: &str) -> DbResult<Self> {
        info!("Connecting to Redis cache");

        let client = redis::Client::open(redis_url)
            .map_err(|e| DbError::ConnectionFailed(format!("Failed to create Redis client: {e}")))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| DbError::ConnectionFailed(format!("Failed to connect to Redis: {e}")))?;

        info!("Connected to Redis cache");
        Ok(RedisCache { conn })
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<Vec<u8>>>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Redis GET failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let mut conn = self.conn.clone();
        // EX 0 is rejected by Redis.
        let secs = ttl.as_secs().max(1);
        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, secs).await {
            warn!(key, error = %e, "Redis SET failed");
        } else {
            debug!(key, ttl_secs = secs, "Redis SET");
        }
    }

    async fn delete(&self, key: &str) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            warn!(key, error = %e, "Redis DEL failed");
        }
    }
}

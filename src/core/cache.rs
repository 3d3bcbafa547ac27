//! Translation cache stores with expiring entries
//!
//! The pipeline only sees [`CacheStore`]. Two backends implement it with the
//! same contract: `get` never returns an entry whose expiry has passed, and
//! `set` always replaces the entry and restarts its TTL.
//!
//! - [`MemoryStore`]: in-process map, lost on restart, expired entries are
//!   dropped lazily on lookup or by [`CacheStore::purge_expired`].
//! - [`RedisStore`]: shared Redis instance, expiry enforced by the server
//!   (`SET .. EX`), so entries survive gateway restarts.

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::config::GatewayConfig;
use crate::core::errors::StoreResult;
use crate::core::models::CacheKey;

/// Key/value store with per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Cached value for `key`, `Ok(None)` when absent or expired.
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous entry. Expires after `ttl`.
    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> StoreResult<()>;

    /// Backend name for logs and the health endpoint
    fn name(&self) -> &'static str;

    /// Eagerly drop expired entries, returning how many were removed.
    /// Backends that expire entries on their own keep the default.
    async fn purge_expired(&self) -> usize {
        0
    }
}

/// Entry held by [`MemoryStore`]; replaced, never mutated
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Volatile in-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet dropped
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it unless a concurrent `set` already replaced it.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> StoreResult<()> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.clone(), entry);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

/// Redis-backed store
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    /// Connect to `url`. Fails when the server cannot be reached.
    ///
    /// Connecting and every command are bounded by `timeout`, so a server that
    /// stops answering surfaces as [`StoreError::Unavailable`] instead of a stall.
    ///
    /// [`StoreError::Unavailable`]: crate::core::errors::StoreError::Unavailable
    pub async fn connect(
        url: &str,
        prefix: impl Into<String>,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client
            .get_connection_manager_with_config(connection_config(timeout))
            .await?;
        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    fn redis_key(&self, key: &CacheKey) -> String {
        redis_key(&self.prefix, key)
    }
}

fn connection_config(timeout: Duration) -> ConnectionManagerConfig {
    ConnectionManagerConfig::new()
        .set_connection_timeout(timeout)
        .set_response_timeout(timeout)
        .set_number_of_retries(1)
}

fn redis_key(prefix: &str, key: &CacheKey) -> String {
    format!("{}{}", prefix, key.encode())
}

/// Redis rejects `EX 0`; sub-second TTLs round up to one second.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 || secs == 0 {
        secs + 1
    } else {
        secs
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value = conn
            .get::<_, Option<String>>(self.redis_key(key))
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.redis_key(key), value, ttl_secs(ttl))
            .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Build the store selected by configuration
///
/// With `REDIS_URL` set the Redis backend is used; if it cannot be reached at
/// startup the gateway falls back to the in-memory store.
pub async fn build_store(config: &GatewayConfig) -> Arc<dyn CacheStore> {
    if let Some(url) = &config.redis_url {
        match RedisStore::connect(url, config.cache_key_prefix.clone(), config.redis_timeout()).await {
            Ok(store) => {
                info!("Using Redis cache store");
                return Arc::new(store);
            }
            Err(e) => {
                warn!("Redis unavailable ({}), falling back to in-memory cache", e);
            }
        }
    }

    debug!("Using in-memory cache store");
    Arc::new(MemoryStore::new())
}

/// Store that is always unreachable, for exercising degraded paths
#[cfg(test)]
pub(crate) struct UnavailableStore;

#[cfg(test)]
#[async_trait]
impl CacheStore for UnavailableStore {
    async fn get(&self, _key: &CacheKey) -> StoreResult<Option<String>> {
        Err(crate::core::errors::StoreError::Unavailable {
            message: "connection refused".to_string(),
        })
    }

    async fn set(&self, _key: &CacheKey, _value: String, _ttl: Duration) -> StoreResult<()> {
        Err(crate::core::errors::StoreError::Unavailable {
            message: "connection refused".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

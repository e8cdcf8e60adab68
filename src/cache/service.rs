//! Cache Service
//!
//! Typed JSON reads and writes, cache-aside, pattern invalidation and hash
//! helpers over whichever driver the client selected.
//!
//! Nothing here returns a backend error to the caller: failed reads are
//! misses, failed writes are no-ops, and both are logged.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::stats::{CacheStats, StatsSnapshot};
use crate::client::KvClient;
use crate::driver::KvDriver;
use crate::error::CacheError;

/// TTL applied by [`CacheService::cache`] when none is given.
pub const DEFAULT_CACHE_TTL: u64 = 3600;

// == Cache Service ==
/// Fail-soft cache API. Cheap to clone; clones share the client and counters.
#[derive(Clone, Debug)]
pub struct CacheService {
    client: Arc<KvClient>,
    stats: Arc<CacheStats>,
}

impl CacheService {
    pub fn new(client: Arc<KvClient>) -> Self {
        Self {
            client,
            stats: Arc::new(CacheStats::new()),
        }
    }

    pub fn client(&self) -> &Arc<KvClient> {
        &self.client
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    async fn driver(&self) -> Arc<dyn KvDriver> {
        self.client.connect().await
    }

    fn absorb(&self, op: &str, key: &str, err: &CacheError) {
        self.stats.record_error();
        error!(op = op, key = key, error = %err, "Cache backend operation failed");
    }

    // == Raw Values ==

    async fn read_raw(&self, key: &str) -> Option<String> {
        match self.driver().await.get(key).await {
            Ok(value) => value,
            Err(e) => {
                self.absorb("GET", key, &e);
                None
            }
        }
    }

    /// Raw string read. Backend failures read as a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        let value = self.read_raw(key).await;
        if value.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        value
    }

    /// Raw string write. Backend failures are logged and dropped.
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) {
        if let Err(e) = self.driver().await.set(key, value, ttl_seconds).await {
            self.absorb("SET", key, &e);
        }
    }

    pub async fn del(&self, key: &str) {
        if let Err(e) = self.driver().await.del(key).await {
            self.absorb("DEL", key, &e);
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.driver().await.exists(key).await.unwrap_or_else(|e| {
            self.absorb("EXISTS", key, &e);
            false
        })
    }

    /// Remaining seconds, `-1` without expiry, `-2` when absent or unknown.
    pub async fn ttl(&self, key: &str) -> i64 {
        self.driver().await.ttl(key).await.unwrap_or_else(|e| {
            self.absorb("TTL", key, &e);
            -2
        })
    }

    pub async fn expire(&self, key: &str, seconds: u64) -> bool {
        self.driver().await.expire(key, seconds).await.unwrap_or_else(|e| {
            self.absorb("EXPIRE", key, &e);
            false
        })
    }

    // == JSON Values ==

    /// Reads and decodes a JSON value.
    ///
    /// A value that fails to decode is reported as a miss and left in place,
    /// since another writer may own its format.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let Some(raw) = self.read_raw(key).await else {
            self.stats.record_miss();
            debug!(key = key, "Cache MISS");
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                self.stats.record_hit();
                debug!(key = key, "Cache HIT");
                Some(value)
            }
            Err(e) => {
                self.stats.record_miss();
                warn!(key = key, error = %e, "Cached value is not valid JSON for this type, treating as miss");
                None
            }
        }
    }

    /// Encodes `value` as JSON and stores it.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl_seconds).await,
            Err(e) => error!(key = key, error = %e, "Failed to encode cache value, skipping write"),
        }
    }

    // == Cache-Aside ==

    /// Returns the cached value for `key`, or runs `compute`, stores its result
    /// for [`DEFAULT_CACHE_TTL`] seconds and returns it.
    pub async fn cache<T, F, Fut>(&self, key: &str, compute: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.cache_with_ttl(key, DEFAULT_CACHE_TTL, compute).await
    }

    /// [`cache`](Self::cache) with an explicit TTL.
    ///
    /// Concurrent misses on the same key are not coalesced: each caller may
    /// run `compute` and the last write wins.
    pub async fn cache_with_ttl<T, F, Fut>(&self, key: &str, ttl_seconds: u64, compute: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(cached) = self.get_json(key).await {
            return cached;
        }

        let value = compute().await;
        self.set_json(key, &value, Some(ttl_seconds)).await;
        value
    }

    /// Cache-aside for fallible computations. Errors from `compute` are
    /// returned to the caller and nothing is stored.
    pub async fn try_cache<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: u64,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(cached) = self.get_json(key).await {
            return Ok(cached);
        }

        let value = compute().await?;
        self.set_json(key, &value, Some(ttl_seconds)).await;
        Ok(value)
    }

    // == Pattern Invalidation ==

    /// Deletes every key matching `pattern` in one batch and returns how many
    /// were removed.
    ///
    /// Best effort: when the backend cannot scan keys this logs a warning and
    /// removes nothing.
    pub async fn invalidate_pattern(&self, pattern: &str) -> u64 {
        let driver = self.driver().await;

        let keys = match driver.keys(pattern).await {
            Ok(keys) => keys,
            Err(CacheError::Unsupported(reason)) => {
                warn!(
                    backend = %driver.kind(),
                    pattern = pattern,
                    reason = %reason,
                    "Pattern scan unavailable on this backend, nothing invalidated"
                );
                return 0;
            }
            Err(e) => {
                self.absorb("KEYS", pattern, &e);
                return 0;
            }
        };

        if keys.is_empty() {
            return 0;
        }

        match driver.del_many(&keys).await {
            Ok(deleted) => {
                debug!(pattern = pattern, deleted = deleted, "Invalidated keys");
                deleted
            }
            Err(e) => {
                self.absorb("DEL", pattern, &e);
                0
            }
        }
    }

    // == Hashes ==

    pub async fn hget(&self, key: &str, field: &str) -> Option<String> {
        self.driver().await.hget(key, field).await.unwrap_or_else(|e| {
            self.absorb("HGET", key, &e);
            None
        })
    }

    pub async fn hset(&self, key: &str, field: &str, value: &str) {
        if let Err(e) = self.driver().await.hset(key, field, value).await {
            self.absorb("HSET", key, &e);
        }
    }

    pub async fn hdel(&self, key: &str, field: &str) {
        if let Err(e) = self.driver().await.hdel(key, field).await {
            self.absorb("HDEL", key, &e);
        }
    }

    pub async fn hgetall(&self, key: &str) -> HashMap<String, String> {
        self.driver().await.hgetall(key).await.unwrap_or_else(|e| {
            self.absorb("HGETALL", key, &e);
            HashMap::new()
        })
    }
}

//! Backend Driver Module
//!
//! Uniform low-level key-value operations over one of three backing stores.
//! Drivers report failures as [`CacheError`](crate::error::CacheError); the
//! layers above decide how to absorb them.

mod entry;
mod memory;
mod native;
mod pattern;
mod rest;


use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::error::Result;

pub use entry::{current_timestamp_ms, CacheEntry, StoredValue};
pub use memory::{MemoryDriver, MemoryStore};
pub use native::RedisDriver;
pub use pattern::KeyPattern;
pub use rest::RestDriver;

// == Backend Kind ==
/// Identifies which store backs the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Remote REST-based key-value service
    Rest,
    /// Native binary-protocol key-value service
    Redis,
    /// In-process map
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Rest => "rest",
            BackendKind::Redis => "redis",
            BackendKind::Memory => "memory",
        };
        f.write_str(name)
    }
}

// == Driver Trait ==
/// Low-level key-value contract implemented identically by every backend.
///
/// TTLs are in seconds; `None` means no expiry. `ttl` follows the usual
/// convention of `-1` for a key without expiry and `-2` for an absent key.
#[async_trait]
pub trait KvDriver: Send + Sync {
    /// Which backend this driver talks to.
    fn kind(&self) -> BackendKind;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()>;

    /// Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> Result<()>;

    /// Deletes every listed key in one batch, returning how many existed.
    async fn del_many(&self, keys: &[String]) -> Result<u64>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn ttl(&self, key: &str) -> Result<i64>;

    /// Returns false when the key is absent.
    async fn expire(&self, key: &str, seconds: u64) -> Result<bool>;

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;

    async fn hdel(&self, key: &str, field: &str) -> Result<()>;

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Lists keys matching a pattern where `*` is a wildcard.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Runs the sliding-window sequence on `key` as one atomic unit:
    /// prune members scored before `now_ms - window_ms`, count what is left,
    /// add `member` scored `now_ms`, and refresh the key's expiry to the window.
    ///
    /// Returns the count observed before the insert.
    async fn slide_window(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        member: &str,
    ) -> Result<u64>;

    /// Lightweight liveness check.
    async fn ping(&self) -> Result<bool>;

    /// Releases any held connection. Nothing to do for most drivers.
    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}

//! Drivers with scripted failures for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::driver::{BackendKind, KvDriver, MemoryDriver};
use crate::error::{CacheError, Result};

fn down<T>(op: &str) -> Result<T> {
    Err(CacheError::Transport(format!("{}: connection reset by peer", op)))
}

/// Every operation fails with a transport error.
#[derive(Debug, Default)]
pub struct FailingDriver;

#[async_trait]
impl KvDriver for FailingDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        down("GET")
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<u64>) -> Result<()> {
        down("SET")
    }

    async fn del(&self, _key: &str) -> Result<()> {
        down("DEL")
    }

    async fn del_many(&self, _keys: &[String]) -> Result<u64> {
        down("DEL")
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        down("EXISTS")
    }

    async fn ttl(&self, _key: &str) -> Result<i64> {
        down("TTL")
    }

    async fn expire(&self, _key: &str, _seconds: u64) -> Result<bool> {
        down("EXPIRE")
    }

    async fn hget(&self, _key: &str, _field: &str) -> Result<Option<String>> {
        down("HGET")
    }

    async fn hset(&self, _key: &str, _field: &str, _value: &str) -> Result<()> {
        down("HSET")
    }

    async fn hdel(&self, _key: &str, _field: &str) -> Result<()> {
        down("HDEL")
    }

    async fn hgetall(&self, _key: &str) -> Result<HashMap<String, String>> {
        down("HGETALL")
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>> {
        down("KEYS")
    }

    async fn slide_window(&self, _key: &str, _now: i64, _window: i64, _member: &str) -> Result<u64> {
        down("MULTI")
    }

    async fn ping(&self) -> Result<bool> {
        down("PING")
    }
}

/// In-process driver whose store refuses pattern scans.
#[derive(Debug, Default)]
pub struct NoScanDriver {
    inner: MemoryDriver,
}

#[async_trait]
impl KvDriver for NoScanDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Rest
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.inner.del(key).await
    }

    async fn del_many(&self, keys: &[String]) -> Result<u64> {
        self.inner.del_many(keys).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        self.inner.ttl(key).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        self.inner.expire(key, seconds).await
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.inner.hget(key, field).await
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.inner.hset(key, field, value).await
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        self.inner.hdel(key, field).await
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        self.inner.hgetall(key).await
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>> {
        Err(CacheError::Unsupported("KEYS: command is not allowed".into()))
    }

    async fn slide_window(&self, key: &str, now: i64, window: i64, member: &str) -> Result<u64> {
        self.inner.slide_window(key, now, window, member).await
    }

    async fn ping(&self) -> Result<bool> {
        self.inner.ping().await
    }
}

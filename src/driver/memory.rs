//! In-Process Driver Module
//!
//! HashMap storage with lazy TTL expiration. Used when no external store is
//! configured, or when connecting to one fails at startup.
//!
//! Expired entries are removed only when a later operation touches them; an
//! expired key that is never accessed again stays in memory for the life of
//! the process.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::entry::{current_timestamp_ms, CacheEntry, StoredValue};
use super::pattern::KeyPattern;
use super::{BackendKind, KvDriver};
use crate::error::{CacheError, Result};

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

// == Memory Store ==
/// Key-value map with lazy expiry, hash emulation and sliding-window records.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, CacheEntry>,
}

impl MemoryStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live entry for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&mut CacheEntry> {
        if self.entries.get(key).is_some_and(CacheEntry::is_expired) {
            self.entries.remove(key);
            debug!(key = key, "Lazily dropped expired entry");
        }
        self.entries.get_mut(key)
    }

    // == Get ==
    /// Retrieves a text value. Window records read as absent.
    pub fn get(&mut self, key: &str) -> Option<String> {
        self.live(key)
            .and_then(|entry| entry.as_text().map(str::to_string))
    }

    // == Set ==
    /// Stores a value, replacing any previous entry and its TTL.
    ///
    /// A TTL of zero expires the key immediately.
    pub fn set(&mut self, key: &str, value: &str, ttl_seconds: Option<u64>) {
        if ttl_seconds == Some(0) {
            self.entries.remove(key);
            return;
        }
        self.entries
            .insert(key.to_string(), CacheEntry::text(value, ttl_seconds));
    }

    // == Delete ==
    /// Removes an entry, returning whether a live one existed.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => !entry.is_expired(),
            None => false,
        }
    }

    pub fn exists(&mut self, key: &str) -> bool {
        self.live(key).is_some()
    }

    // == TTL ==
    /// Remaining seconds, `-1` without expiry, `-2` when absent.
    pub fn ttl(&mut self, key: &str) -> i64 {
        match self.live(key) {
            Some(entry) => entry
                .ttl_remaining()
                .map_or(-1, |secs| i64::try_from(secs).unwrap_or(i64::MAX)),
            None => -2,
        }
    }

    pub fn expire(&mut self, key: &str, seconds: u64) -> bool {
        if seconds == 0 {
            return self.delete(key);
        }
        match self.live(key) {
            Some(entry) => {
                entry.expire_in_ms(seconds.saturating_mul(1000));
                true
            }
            None => false,
        }
    }

    // == Hash Emulation ==
    // Hash fields live as ordinary entries under `key:field`.

    pub fn hget(&mut self, key: &str, field: &str) -> Option<String> {
        self.get(&field_key(key, field))
    }

    pub fn hset(&mut self, key: &str, field: &str, value: &str) {
        self.set(&field_key(key, field), value, None);
    }

    pub fn hdel(&mut self, key: &str, field: &str) -> bool {
        self.delete(&field_key(key, field))
    }

    /// Collects every live field of `key`, skipping expired field entries.
    pub fn hgetall(&mut self, key: &str) -> HashMap<String, String> {
        let prefix = field_key(key, "");
        let now = current_timestamp_ms();
        self.entries
            .iter()
            .filter(|(k, entry)| k.starts_with(&prefix) && !entry.is_expired_at(now))
            .filter_map(|(k, entry)| {
                entry
                    .as_text()
                    .map(|value| (k[prefix.len()..].to_string(), value.to_string()))
            })
            .collect()
    }

    // == Keys ==
    /// Lists live keys matching `pattern`.
    pub fn keys(&self, pattern: &KeyPattern) -> Vec<String> {
        let now = current_timestamp_ms();
        self.entries
            .iter()
            .filter(|(k, entry)| !entry.is_expired_at(now) && pattern.matches(k))
            .map(|(k, _)| k.clone())
            .collect()
    }

    // == Sliding Window ==
    /// Prunes, counts, records and re-arms the window record under `key`.
    ///
    /// Returns the number of members that were inside the window before
    /// this call added its own. A key holding a text value is left untouched
    /// and reported as a type mismatch.
    pub fn slide_window(
        &mut self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        member: &str,
    ) -> Result<u64> {
        let window_start = now_ms - window_ms;

        if self.live(key).is_none() {
            self.entries.insert(key.to_string(), CacheEntry::window());
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(0);
        };

        let count = match &mut entry.value {
            StoredValue::Window(members) => {
                members.retain(|(ts, _)| *ts > window_start);
                let count = members.len() as u64;
                members.push((now_ms, member.to_string()));
                count
            }
            StoredValue::Text(_) => return Err(CacheError::Protocol(WRONG_TYPE.to_string())),
        };

        entry.expire_in_ms(u64::try_from(window_ms).unwrap_or(0));
        Ok(count)
    }

    // == Length ==
    /// Number of stored entries, expired-but-untouched ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn field_key(key: &str, field: &str) -> String {
    format!("{}:{}", key, field)
}

// == Memory Driver ==
/// Async driver over a [`MemoryStore`].
///
/// Every operation takes the store's write lock, which also makes the
/// sliding-window sequence a single critical section.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    store: RwLock<MemoryStore>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvDriver for MemoryDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.store.write().await.get(key))
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        self.store.write().await.set(key, value, ttl_seconds);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.store.write().await.delete(key);
        Ok(())
    }

    async fn del_many(&self, keys: &[String]) -> Result<u64> {
        let mut store = self.store.write().await;
        Ok(keys.iter().filter(|key| store.delete(key)).count() as u64)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.store.write().await.exists(key))
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        Ok(self.store.write().await.ttl(key))
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        Ok(self.store.write().await.expire(key, seconds))
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self.store.write().await.hget(key, field))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.store.write().await.hset(key, field, value);
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        self.store.write().await.hdel(key, field);
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.store.write().await.hgetall(key))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = KeyPattern::new(pattern)?;
        Ok(self.store.read().await.keys(&pattern))
    }

    async fn slide_window(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        member: &str,
    ) -> Result<u64> {
        self.store
            .write()
            .await
            .slide_window(key, now_ms, window_ms, member)
    }

    async fn ping(&self) -> Result<bool> {
        Ok(true)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_store_set_and_get() {
        let mut store = MemoryStore::new();

        store.set("key1", "value1", None);

        assert_eq!(store.get("key1").as_deref(), Some("value1"));
        assert!(store.exists("key1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = MemoryStore::new();
        assert!(store.get("nonexistent").is_none());
        assert!(!store.exists("nonexistent"));
    }

    #[test]
    fn test_store_delete_is_idempotent() {
        let mut store = MemoryStore::new();

        store.set("key1", "value1", None);
        assert!(store.delete("key1"));
        assert!(!store.delete("key1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_ttl_expiration_is_lazy() {
        let mut store = MemoryStore::new();

        store.set("key1", "value1", Some(1));
        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(1100));

        // Still held until something touches it
        assert_eq!(store.len(), 1);
        assert!(store.get("key1").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_store_zero_ttl_expires_immediately() {
        let mut store = MemoryStore::new();
        store.set("key1", "value1", None);
        store.set("key1", "value2", Some(0));
        assert!(store.get("key1").is_none());
    }

    #[test]
    fn test_store_ttl_codes() {
        let mut store = MemoryStore::new();

        store.set("forever", "v", None);
        store.set("short", "v", Some(30));

        assert_eq!(store.ttl("forever"), -1);
        assert_eq!(store.ttl("missing"), -2);
        let remaining = store.ttl("short");
        assert!((29..=30).contains(&remaining));
    }

    #[test]
    fn test_store_expire() {
        let mut store = MemoryStore::new();

        assert!(!store.expire("missing", 10));

        store.set("key1", "v", None);
        assert!(store.expire("key1", 10));
        assert!(store.ttl("key1") > 0);
    }

    #[test]
    fn test_store_hash_emulation() {
        let mut store = MemoryStore::new();

        store.hset("user:1", "name", "ada");
        store.hset("user:1", "role", "admin");
        store.hset("user:10", "name", "bob");

        assert_eq!(store.hget("user:1", "name").as_deref(), Some("ada"));
        assert!(store.get("user:1:name").is_some());

        let all = store.hgetall("user:1");
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("role").map(String::as_str), Some("admin"));

        assert!(store.hdel("user:1", "role"));
        assert_eq!(store.hgetall("user:1").len(), 1);
    }

    #[test]
    fn test_store_hgetall_skips_expired_fields() {
        let mut store = MemoryStore::new();

        store.hset("h", "live", "1");
        store.set("h:stale", "2", Some(1));

        sleep(Duration::from_millis(1100));

        let all = store.hgetall("h");
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("live"));
    }

    #[test]
    fn test_store_keys_pattern() {
        let mut store = MemoryStore::new();

        store.set("a:1", "v", None);
        store.set("a:2", "v", None);
        store.set("b:1", "v", None);

        let pattern = KeyPattern::new("a:*").unwrap();
        let mut keys = store.keys(&pattern);
        keys.sort();
        assert_eq!(keys, vec!["a:1".to_string(), "a:2".to_string()]);
    }

    #[test]
    fn test_store_slide_window_counts_before_insert() {
        let mut store = MemoryStore::new();
        let now = 1_000_000;

        assert_eq!(store.slide_window("rl", now, 10_000, "t1").unwrap(), 0);
        assert_eq!(store.slide_window("rl", now + 1, 10_000, "t2").unwrap(), 1);
        assert_eq!(store.slide_window("rl", now + 2, 10_000, "t3").unwrap(), 2);

        // Everything older than the window is pruned
        assert_eq!(store.slide_window("rl", now + 10_002, 10_000, "t4").unwrap(), 0);
    }

    #[test]
    fn test_store_slide_window_is_a_key() {
        let mut store = MemoryStore::new();

        store.slide_window("ratelimit:ip", 5_000, 10_000, "t1").unwrap();

        assert!(store.exists("ratelimit:ip"));
        assert!(store.get("ratelimit:ip").is_none());
        assert!(store.ttl("ratelimit:ip") > 0);
        assert!(store.delete("ratelimit:ip"));
    }

    #[test]
    fn test_store_slide_window_rejects_text_value() {
        let mut store = MemoryStore::new();
        store.set("rl", r#"{"owner":"u1"}"#, None);

        let result = store.slide_window("rl", 5_000, 10_000, "t1");
        assert!(matches!(result, Err(CacheError::Protocol(msg)) if msg.starts_with("WRONGTYPE")));

        assert_eq!(store.get("rl").as_deref(), Some(r#"{"owner":"u1"}"#));
        assert_eq!(store.ttl("rl"), -1);
    }

    #[test]
    fn test_store_slide_window_replaces_expired_text_value() {
        let mut store = MemoryStore::new();
        store.set("rl", "stale", Some(1));

        sleep(Duration::from_millis(1100));

        assert_eq!(store.slide_window("rl", 5_000, 10_000, "t1").unwrap(), 0);
        assert_eq!(store.slide_window("rl", 5_001, 10_000, "t2").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_driver_del_many() {
        let driver = MemoryDriver::new();
        driver.set("a:1", "v", None).await.unwrap();
        driver.set("a:2", "v", None).await.unwrap();

        let removed = driver
            .del_many(&["a:1".to_string(), "a:2".to_string(), "a:3".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert!(!driver.exists("a:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_driver_ping_and_kind() {
        let driver = MemoryDriver::new();
        assert!(driver.ping().await.unwrap());
        assert_eq!(driver.kind(), BackendKind::Memory);
    }
}

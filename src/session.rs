//! Session Store
//!
//! Keyed JSON sessions under the `session:` namespace. A session exists for
//! as long as its TTL has not elapsed.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::CacheService;

/// Key namespace for sessions.
pub const SESSION_PREFIX: &str = "session:";

/// Default session lifetime: one day.
pub const DEFAULT_SESSION_TTL: u64 = 86_400;

#[derive(Clone, Debug)]
pub struct SessionStore {
    cache: CacheService,
}

impl SessionStore {
    pub fn new(cache: CacheService) -> Self {
        Self { cache }
    }

    fn key(id: &str) -> String {
        format!("{}{}", SESSION_PREFIX, id)
    }

    /// Stores session data for [`DEFAULT_SESSION_TTL`] seconds.
    pub async fn set<T: Serialize + ?Sized>(&self, id: &str, data: &T) {
        self.set_with_ttl(id, data, DEFAULT_SESSION_TTL).await;
    }

    pub async fn set_with_ttl<T: Serialize + ?Sized>(&self, id: &str, data: &T, ttl_seconds: u64) {
        self.cache
            .set_json(&Self::key(id), data, Some(ttl_seconds))
            .await;
    }

    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> Option<T> {
        self.cache.get_json(&Self::key(id)).await
    }

    pub async fn delete(&self, id: &str) {
        self.cache.del(&Self::key(id)).await;
    }

    /// Extends a live session's lifetime. Returns false if it no longer exists.
    pub async fn touch(&self, id: &str, ttl_seconds: u64) -> bool {
        self.cache.expire(&Self::key(id), ttl_seconds).await
    }
}

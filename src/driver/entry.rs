//! Cache Entry Module
//!
//! Defines the structure for individual in-process entries with TTL support.

use chrono::Utc;

// == Stored Value ==
/// Payload held by an in-process entry.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// Plain string value (also used for emulated hash fields)
    Text(String),
    /// Sliding-window record: `(timestamp_ms, token)` pairs in insertion order
    Window(Vec<(i64, String)>),
}

// == Cache Entry ==
/// Represents a single entry with value and expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: StoredValue,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructors ==
    /// Creates a new text entry with optional TTL in seconds.
    pub fn text(value: impl Into<String>, ttl_seconds: Option<u64>) -> Self {
        Self::with_value(StoredValue::Text(value.into()), ttl_seconds)
    }

    /// Creates an empty sliding-window record.
    pub fn window() -> Self {
        Self::with_value(StoredValue::Window(Vec::new()), None)
    }

    fn with_value(value: StoredValue, ttl_seconds: Option<u64>) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            expires_at: ttl_seconds.map(|ttl| now.saturating_add(ttl.saturating_mul(1000))),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as [`is_expired`](Self::is_expired) against a caller-supplied clock.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    /// Text payload, if this entry holds one.
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            StoredValue::Text(text) => Some(text),
            StoredValue::Window(_) => None,
        }
    }

    // == Expiry Management ==
    /// Sets the expiry relative to now, in milliseconds.
    pub fn expire_in_ms(&mut self, ms: u64) {
        self.expires_at = Some(current_timestamp_ms().saturating_add(ms));
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }

    /// Returns remaining TTL in whole seconds, rounded up so a live entry
    /// never reports zero.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.ttl_remaining_ms().map(|ms| ms.div_ceil(1000))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::text("test_value", None);

        assert_eq!(entry.as_text(), Some("test_value"));
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::text("test_value", Some(1));

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_ttl_remaining_rounds_up() {
        let entry = CacheEntry::text("test_value", Some(10));

        let remaining = entry.ttl_remaining().unwrap();
        assert!(remaining <= 10);
        assert!(remaining >= 9);
    }

    #[test]
    fn test_window_entry_has_no_text() {
        let entry = CacheEntry::window();
        assert!(entry.as_text().is_none());
        assert!(entry.expires_at.is_none());
    }

    #[test]
    fn test_expire_in_ms_sets_deadline() {
        let mut entry = CacheEntry::window();
        entry.expire_in_ms(5_000);

        let remaining = entry.ttl_remaining_ms().unwrap();
        assert!(remaining <= 5_000);
        assert!(remaining > 4_000);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = CacheEntry {
            value: StoredValue::Text("test".to_string()),
            expires_at: Some(now),
        };

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
        assert!(!entry.is_expired_at(now - 1));
    }
}
